//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`ShardSource`](crate::source::ShardSource)
//! and fixtures for building index and shard documents, so the catalog can
//! be exercised end to end without files on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use shardcat_core::testing::{MockShardSource, fixtures};
//!
//! let source = MockShardSource::new();
//! source.set_index_json(&fixtures::index_json(&[
//!     fixtures::CategorySpec::new("acao", "Ação", 3),
//! ])).await;
//! source.add_page("acao", 1, 1, fixtures::items("acao", 3)).await;
//! ```

mod mock_source;

pub use mock_source::{MockShardSource, RecordedRead};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::{json, Value};

    use crate::loader::{CatalogItem, ContentType, LoadedPage, ShardKey, TmdbMetadata};

    /// Create a catalog item with reasonable defaults.
    pub fn item(id: &str, name: &str, content_type: ContentType) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            url: Some(format!("http://stream.example/{}.mp4", id)),
            content_type,
            is_adult: false,
            logo: None,
            category: None,
            series_name: None,
            season: None,
            episode: None,
            tmdb: None,
            episodes: None,
        }
    }

    /// Create a movie item.
    pub fn movie(id: &str, name: &str) -> CatalogItem {
        item(id, name, ContentType::Movie)
    }

    /// Create a series item.
    pub fn series(id: &str, name: &str) -> CatalogItem {
        item(id, name, ContentType::Series)
    }

    /// Create an adult movie item.
    pub fn adult(id: &str, name: &str) -> CatalogItem {
        let mut item = movie(id, name);
        item.is_adult = true;
        item
    }

    /// Attach enriched metadata to an item.
    pub fn enriched(mut item: CatalogItem, rating: f32, genres: &[&str]) -> CatalogItem {
        item.tmdb = Some(TmdbMetadata {
            rating: Some(rating),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..TmdbMetadata::default()
        });
        item
    }

    /// `count` movies with ids `{prefix}-{i}` and names `{prefix} {i}`.
    pub fn items(prefix: &str, count: usize) -> Vec<CatalogItem> {
        (0..count)
            .map(|i| movie(&format!("{}-{}", prefix, i), &format!("{} {}", prefix, i)))
            .collect()
    }

    /// A wrapped page document.
    pub fn shard_json(
        category: &str,
        page: u32,
        total_pages: u32,
        movies: Vec<CatalogItem>,
        series: Vec<CatalogItem>,
    ) -> Value {
        json!({
            "category": category,
            "page": page,
            "totalPages": total_pages,
            "movies": movies,
            "series": series,
        })
    }

    /// A legacy bare-array shard.
    pub fn legacy_shard_json(items: Vec<CatalogItem>) -> Value {
        json!(items)
    }

    /// An adult shard document.
    pub fn adult_shard_json(category: &str, items: Vec<CatalogItem>) -> Value {
        json!({
            "category": category,
            "items": items,
        })
    }

    /// A loaded page stamped now.
    pub fn loaded_page(key: ShardKey, items: Vec<CatalogItem>, total_pages: u32) -> LoadedPage {
        LoadedPage {
            key,
            items,
            total_pages,
            loaded_at: Utc::now(),
        }
    }

    /// Builder for one category entry of an index document.
    #[derive(Debug, Clone)]
    pub struct CategorySpec {
        id: String,
        name: String,
        movies: u32,
        series: u32,
        adult: u32,
        total: u32,
        pages: Option<u32>,
        movies_file: bool,
    }

    impl CategorySpec {
        /// A category of `total` movies on a single page.
        pub fn new(id: &str, name: &str, total: u32) -> Self {
            Self {
                id: id.to_string(),
                name: name.to_string(),
                movies: total,
                series: 0,
                adult: 0,
                total,
                pages: None,
                movies_file: false,
            }
        }

        /// Override the per-type counts.
        pub fn counts(mut self, movies: u32, series: u32, adult: u32) -> Self {
            self.movies = movies;
            self.series = series;
            self.adult = adult;
            self
        }

        /// Number of pages.
        pub fn pages(mut self, pages: u32) -> Self {
            self.pages = Some(pages);
            self
        }

        /// Mark the movies as stored in a separate `_movies` shard.
        pub fn movies_file(mut self) -> Self {
            self.movies_file = true;
            self
        }

        fn to_json(&self) -> Value {
            let mut value = json!({
                "id": self.id,
                "name": self.name,
                "movieCount": self.movies,
                "seriesCount": self.series,
                "adultCount": self.adult,
                "totalCount": self.total,
            });
            if let Some(pages) = self.pages {
                value["pages"] = json!(pages);
                value["hasMovies"] = json!(self.movies_file);
            }
            value
        }
    }

    /// An index document with the given categories.
    pub fn index_json(categories: &[CategorySpec]) -> Value {
        json!({
            "version": 2,
            "generatedAt": "2025-01-12T10:30:00.000000",
            "totalMovies": categories.iter().map(|c| c.movies as u64).sum::<u64>(),
            "totalSeries": categories.iter().map(|c| c.series as u64).sum::<u64>(),
            "totalAdult": categories.iter().map(|c| c.adult as u64).sum::<u64>(),
            "maxItemsPerPage": 5000,
            "categories": categories.iter().map(CategorySpec::to_json).collect::<Vec<_>>(),
        })
    }
}
