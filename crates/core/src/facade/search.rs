//! Search and filter over resident pages.
//!
//! Only pages currently held by the cache are scanned, plus the index
//! metadata. A category whose pages were never loaded (or were evicted)
//! contributes nothing beyond its index entry.

use serde::Serialize;

use crate::index::CatalogIndexEntry;
use crate::loader::{CatalogItem, ContentType, ShardKey};

/// Narrowing applied to search and filter results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    pub content_type: Option<ContentType>,
    /// Overrides `search.include_adult` from the config when set.
    pub include_adult: Option<bool>,
    /// Genre name, compared case-insensitively.
    pub genre: Option<String>,
    /// Items without a rating never pass a rating filter.
    pub min_rating: Option<f32>,
    /// Restrict to one category id.
    pub category: Option<String>,
}

impl SearchFilters {
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn include_adult(mut self, include: bool) -> Self {
        self.include_adult = Some(include);
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn min_rating(mut self, rating: f32) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category = Some(category_id.into());
        self
    }

    /// Whether `item` passes every filter except the category and adult ones,
    /// which depend on where the item was found.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if let Some(content_type) = self.content_type {
            if item.content_type != content_type {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if !item.genres().iter().any(|g| g.eq_ignore_ascii_case(genre)) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            match item.rating() {
                Some(rating) if rating >= min => {}
                _ => return false,
            }
        }
        true
    }

    pub(crate) fn admits_category(&self, category_id: &str) -> bool {
        self.category.as_deref().map_or(true, |c| c == category_id)
    }
}

/// One item found in a resident page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub category_id: String,
    /// Shard page the item was found on. The adult and movies shards report
    /// their reserved page numbers.
    pub page: u32,
    pub item: CatalogItem,
}

/// Result of [`Catalog::search`](super::Catalog::search).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Index entries whose name or id contains the query.
    pub categories: Vec<CatalogIndexEntry>,
    pub items: Vec<SearchHit>,
    /// Number of resident pages scanned.
    pub scanned_shards: usize,
    /// Whether `items` was cut off at the result limit.
    pub truncated: bool,
}

/// Case-insensitive query over an item's name and show name. `query` must
/// already be lowercase; an empty query matches everything.
pub(crate) fn item_matches_query(item: &CatalogItem, query: &str) -> bool {
    query.is_empty()
        || item.name.to_lowercase().contains(query)
        || item
            .series_name
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(query))
}

/// Whether an item counts as adult content, given the page it came from.
pub(crate) fn is_adult_content(
    item: &CatalogItem,
    key: &ShardKey,
    entry: Option<&CatalogIndexEntry>,
) -> bool {
    item.is_adult || key.is_adult() || entry.is_some_and(|e| e.is_adult)
}
