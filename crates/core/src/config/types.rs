use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogSourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Where the shard files live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSourceConfig {
    /// Directory holding the index and the category shards.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Index file name, relative to `root`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for CatalogSourceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            index_file: default_index_file(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("assets/catalog")
}

fn default_index_file() -> String {
    "index.json".to_string()
}

/// Shard cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of loaded pages resident at once.
    #[serde(default = "default_max_cached_shards")]
    pub max_cached_shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_shards: default_max_cached_shards(),
        }
    }
}

fn default_max_cached_shards() -> usize {
    5
}

/// Shard loader configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Items per page written by the shard producer. Informational only,
    /// used to estimate the resident footprint of a full cache.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    5000
}

/// Search over resident pages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Maximum item hits returned by a single search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Whether adult categories and items are visible by default.
    #[serde(default)]
    pub include_adult: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            include_adult: false,
        }
    }
}

fn default_max_results() -> usize {
    200
}

impl Config {
    /// Upper bound on items resident in the cache when every page is full.
    pub fn max_resident_items(&self) -> usize {
        self.cache.max_cached_shards * self.loader.page_size
    }
}
