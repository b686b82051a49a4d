//! Types for the catalog index.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index artifact as written by the shard producer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub total_movies: u64,
    #[serde(default)]
    pub total_series: u64,
    #[serde(default)]
    pub total_adult: u64,
    #[serde(default)]
    pub max_items_per_page: Option<u32>,
    pub categories: Vec<IndexCategory>,
}

/// One category record in the index artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub movie_count: u32,
    #[serde(default)]
    pub series_count: u32,
    #[serde(default)]
    pub adult_count: u32,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub has_movies: Option<bool>,
}

/// Substrings that mark a category as adult.
const ADULT_MARKERS: &[&str] = &["adult", "adulto", "xxx", "[hot]"];

/// Summary of one category. Immutable after the index is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogIndexEntry {
    /// Stable slug, unique within the index.
    pub category_id: String,
    pub display_name: String,
    pub movie_count: u32,
    pub series_count: u32,
    pub adult_count: u32,
    /// Total items, as stated by the producer.
    pub total_count: u32,
    /// Number of pages, at least 1. Includes the movies page, if any.
    pub page_count: u32,
    /// Page served from the category's separate movies shard. Always the
    /// last page when present.
    pub movies_page: Option<u32>,
    /// Whether the movies live in a separate `_movies` shard rather than
    /// inside the pages.
    pub has_movies: bool,
    pub is_adult: bool,
}

impl From<IndexCategory> for CatalogIndexEntry {
    fn from(c: IndexCategory) -> Self {
        let regular = c.movie_count.saturating_add(c.series_count);
        let summed = regular.saturating_add(c.adult_count);
        let lowered = format!("{} {}", c.id, c.name).to_lowercase();
        let is_adult = ADULT_MARKERS.iter().any(|m| lowered.contains(m))
            || (c.adult_count > 0 && regular == 0);

        // Paginated categories keep series in `_pN` pages and every movie in
        // one `_movies` shard, which follows the last series page.
        let has_movies = c.pages.is_some() && c.has_movies.unwrap_or(c.movie_count > 0);
        let pages = c.pages.unwrap_or(1).max(1);
        let (page_count, movies_page) = if has_movies {
            let series_pages = if c.series_count == 0 { 0 } else { pages };
            let movies_page = series_pages.saturating_add(1);
            (movies_page, Some(movies_page))
        } else {
            (pages, None)
        };

        Self {
            total_count: c.total_count.unwrap_or(summed),
            page_count,
            movies_page,
            has_movies,
            category_id: c.id,
            display_name: c.name,
            movie_count: c.movie_count,
            series_count: c.series_count,
            adult_count: c.adult_count,
            is_adult,
        }
    }
}

impl CatalogIndexEntry {
    /// Whether the category is split across more than one page.
    pub fn is_paginated(&self) -> bool {
        self.page_count > 1
    }
}

/// Errors for index loading.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    #[error("Catalog index not found: {0}")]
    Missing(String),

    #[error("Catalog index is corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str, movies: u32, series: u32, adult: u32) -> IndexCategory {
        IndexCategory {
            id: id.to_string(),
            name: name.to_string(),
            movie_count: movies,
            series_count: series,
            adult_count: adult,
            total_count: None,
            pages: None,
            has_movies: None,
        }
    }

    #[test]
    fn test_entry_defaults() {
        let entry = CatalogIndexEntry::from(category("acao", "Ação", 10, 5, 0));
        assert_eq!(entry.total_count, 15);
        assert_eq!(entry.page_count, 1);
        assert_eq!(entry.movies_page, None);
        assert!(!entry.has_movies);
        assert!(!entry.is_adult);
        assert!(!entry.is_paginated());
    }

    #[test]
    fn test_zero_pages_is_one() {
        let mut c = category("x", "X", 1, 0, 0);
        c.pages = Some(0);
        assert_eq!(CatalogIndexEntry::from(c).page_count, 1);
    }

    #[test]
    fn test_movies_shard_follows_series_pages() {
        let mut c = category("netflix", "Netflix", 40, 9000, 0);
        c.pages = Some(2);
        c.has_movies = Some(true);
        let entry = CatalogIndexEntry::from(c);
        assert!(entry.has_movies);
        assert_eq!(entry.page_count, 3);
        assert_eq!(entry.movies_page, Some(3));
    }

    #[test]
    fn test_movies_only_category_starts_at_movies_shard() {
        let mut c = category("lancamentos", "Lançamentos", 6000, 0, 0);
        c.pages = Some(1);
        c.has_movies = Some(true);
        let entry = CatalogIndexEntry::from(c);
        assert_eq!(entry.page_count, 1);
        assert_eq!(entry.movies_page, Some(1));
    }

    #[test]
    fn test_paginated_without_movies_shard() {
        let mut c = category("novelas", "Novelas", 0, 12000, 0);
        c.pages = Some(3);
        c.has_movies = Some(false);
        let entry = CatalogIndexEntry::from(c);
        assert_eq!(entry.page_count, 3);
        assert_eq!(entry.movies_page, None);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let entry = CatalogIndexEntry::from(category("a", "A", u32::MAX, 1, 7));
        assert_eq!(entry.total_count, u32::MAX);
        assert!(!entry.is_adult);

        let entry = CatalogIndexEntry::from(category("b", "B", 0, 0, u32::MAX));
        assert_eq!(entry.total_count, u32::MAX);
        assert!(entry.is_adult);
    }

    #[test]
    fn test_adult_detection() {
        assert!(CatalogIndexEntry::from(category("adultos", "Adultos", 0, 0, 5)).is_adult);
        assert!(CatalogIndexEntry::from(category("hot", "[HOT] Filmes", 3, 0, 0)).is_adult);
        assert!(CatalogIndexEntry::from(category("misc", "Misc", 0, 0, 2)).is_adult);
        assert!(!CatalogIndexEntry::from(category("filmes", "Filmes", 10, 0, 2)).is_adult);
    }
}
