pub mod cache;
pub mod config;
pub mod facade;
pub mod index;
pub mod loader;
pub mod metrics;
pub mod pagination;
pub mod source;
pub mod testing;

pub use cache::{CacheStats, LruCache, ShardCache};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, CatalogSourceConfig, Config,
    ConfigError, LoaderConfig, SearchConfig,
};
pub use facade::{Catalog, CatalogError, SearchFilters, SearchHit, SearchResults};
pub use index::{CatalogIndex, CatalogIndexEntry, IndexError};
pub use loader::{
    decode_shard, CatalogItem, ContentType, LoadHandle, LoadedPage, ShardError, ShardKey,
    ShardLoader, ADULT_PAGE, MOVIES_PAGE,
};
pub use pagination::{
    ItemsView, PageLayout, PaginationController, PaginationError, SessionSnapshot, SessionState,
};
pub use source::{FsShardSource, ShardSource, SourceError};
