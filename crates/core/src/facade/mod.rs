//! The catalog facade.
//!
//! [`Catalog`] wires the index, shard loader, cache and pagination
//! controller together and is the only type presentation code needs. Every
//! failure from the layers below is remapped into [`CatalogError`].
//!
//! Search and filter only see pages that are resident in the cache, plus
//! the index metadata. Searching the full catalog would mean loading every
//! shard; callers that need a category searched should select it (or warm
//! its pages) first.

mod error;
mod search;

pub use error::CatalogError;
pub use search::{SearchFilters, SearchHit, SearchResults};

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ShardCache};
use crate::config::Config;
use crate::index::{CatalogIndex, CatalogIndexEntry};
use crate::loader::{CatalogItem, LoadedPage, ShardKey, ShardLoader};
use crate::pagination::{ItemsView, PageLayout, PaginationController, SessionSnapshot};
use crate::source::{FsShardSource, ShardSource};
use search::{is_adult_content, item_matches_query};

/// Lazy, memory-bounded catalog.
pub struct Catalog {
    config: Config,
    source: Arc<dyn ShardSource>,
    index: OnceCell<Arc<CatalogIndex>>,
    cache: Arc<ShardCache>,
    loader: ShardLoader,
    pagination: PaginationController,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("source", &self.source.name())
            .field("initialized", &self.index.initialized())
            .field("cache", &self.cache.stats())
            .finish()
    }
}

impl Catalog {
    /// Build a catalog reading through `source`.
    pub fn new(config: &Config, source: Arc<dyn ShardSource>) -> Self {
        let cache = Arc::new(ShardCache::new(config.cache.max_cached_shards));
        let loader = ShardLoader::new(Arc::clone(&source));
        let pagination = PaginationController::new(Arc::clone(&cache), loader.clone());
        Self {
            config: config.clone(),
            source,
            index: OnceCell::new(),
            cache,
            loader,
            pagination,
        }
    }

    /// Build a catalog reading shard files under `config.catalog.root`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, Arc::new(FsShardSource::from_config(&config.catalog)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// Load the index. Idempotent: later calls return the loaded index
    /// without reading it again. A failed load leaves the catalog
    /// uninitialized, so calling again retries.
    pub async fn initialize(&self) -> Result<Arc<CatalogIndex>, CatalogError> {
        let index = self
            .index
            .get_or_try_init(|| async {
                CatalogIndex::load(self.source.as_ref())
                    .await
                    .map(Arc::new)
                    .map_err(|e| {
                        warn!(error = %e, "Catalog unavailable");
                        CatalogError::from(e)
                    })
            })
            .await?;
        Ok(Arc::clone(index))
    }

    pub fn is_initialized(&self) -> bool {
        self.index.initialized()
    }

    /// The loaded index.
    pub fn index(&self) -> Result<&CatalogIndex, CatalogError> {
        self.index
            .get()
            .map(Arc::as_ref)
            .ok_or(CatalogError::NotInitialized)
    }

    /// Categories by descending size; adult categories only when asked for.
    pub fn categories(&self, include_adult: bool) -> Result<Vec<CatalogIndexEntry>, CatalogError> {
        Ok(self
            .index()?
            .list_categories(include_adult)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn category(&self, category_id: &str) -> Result<CatalogIndexEntry, CatalogError> {
        self.index()?
            .get(category_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownCategory(category_id.to_string()))
    }

    // =========================================================================
    // Browsing
    // =========================================================================

    /// Make `category_id` the active category and return its first page.
    pub async fn select_category(&self, category_id: &str) -> Result<ItemsView, CatalogError> {
        let entry = self.category(category_id)?;
        self.pagination
            .select_category(PageLayout::from(&entry))
            .await
            .map_err(|e| self.surface(e.into()))
    }

    /// Load the next page of the active category.
    ///
    /// Returns the whole list so far. A no-op when the category is
    /// exhausted or a load is already running.
    pub async fn load_more(&self) -> Result<ItemsView, CatalogError> {
        self.pagination
            .load_more()
            .await
            .map_err(|e| self.surface(e.into()))
    }

    /// Items loaded so far for the active category, in page order.
    pub async fn current_items(&self) -> Result<ItemsView, CatalogError> {
        self.pagination
            .current_items()
            .await
            .map_err(|e| self.surface(e.into()))
    }

    /// Warm the next page of the active category in the background.
    pub fn prefetch_next(&self) -> bool {
        self.pagination.prefetch_next()
    }

    pub fn session(&self) -> SessionSnapshot {
        self.pagination.snapshot()
    }

    /// Adult items of a category. Cached like any page, never paginated.
    pub async fn load_adult(&self, category_id: &str) -> Result<Arc<LoadedPage>, CatalogError> {
        let entry = self.category(category_id)?;
        self.cache
            .get_or_load(&self.loader, &ShardKey::adult(entry.category_id), 1)
            .await
            .map_err(|e| self.surface(e.into()))
    }

    fn surface(&self, err: CatalogError) -> CatalogError {
        match &err {
            CatalogError::Superseded(_) => {}
            e if e.is_retryable() => warn!(kind = e.kind(), error = %e, "Catalog load failed, retryable"),
            e => warn!(kind = e.kind(), error = %e, "Catalog load failed"),
        }
        err
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Search category names and the items of resident pages.
    ///
    /// Pages that are not cached are not searched. Reading pages here does
    /// not change their eviction order.
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Result<SearchResults, CatalogError> {
        let index = self.index()?;
        let query = query.trim().to_lowercase();
        let include_adult = filters
            .include_adult
            .unwrap_or(self.config.search.include_adult);
        let limit = self.config.search.max_results;

        let categories = if query.is_empty() {
            Vec::new()
        } else {
            index
                .list_categories(include_adult)
                .into_iter()
                .filter(|e| filters.admits_category(&e.category_id))
                .filter(|e| {
                    e.display_name.to_lowercase().contains(&query)
                        || e.category_id.to_lowercase().contains(&query)
                })
                .cloned()
                .collect()
        };

        let mut pages = self.cache.resident_pages();
        pages.sort_by(|a, b| a.key.cmp(&b.key));

        let mut results = SearchResults {
            categories,
            ..SearchResults::default()
        };
        'pages: for page in pages
            .iter()
            .filter(|p| filters.admits_category(&p.key.category_id))
        {
            let entry = index.get(&page.key.category_id);
            if !include_adult && (page.key.is_adult() || entry.is_some_and(|e| e.is_adult)) {
                continue;
            }
            results.scanned_shards += 1;
            for item in &page.items {
                if !include_adult && is_adult_content(item, &page.key, entry) {
                    continue;
                }
                if !item_matches_query(item, &query) || !filters.matches(item) {
                    continue;
                }
                if results.items.len() >= limit {
                    results.truncated = true;
                    break 'pages;
                }
                results.items.push(SearchHit {
                    category_id: page.key.category_id.clone(),
                    page: page.key.page,
                    item: item.clone(),
                });
            }
        }

        debug!(
            query = %query,
            categories = results.categories.len(),
            items = results.items.len(),
            scanned_shards = results.scanned_shards,
            "Searched resident pages"
        );
        Ok(results)
    }

    /// Resident items of one category that pass `filters`, in page order.
    ///
    /// Only cached pages are included. `filters.category` is ignored.
    pub fn filter_category(
        &self,
        category_id: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let entry = self.category(category_id)?;
        let include_adult = filters
            .include_adult
            .unwrap_or(self.config.search.include_adult);

        let mut pages: Vec<_> = self
            .cache
            .resident_pages()
            .into_iter()
            .filter(|p| p.key.category_id == entry.category_id)
            .collect();
        pages.sort_by_key(|p| p.key.page);

        let items = pages
            .iter()
            .flat_map(|page| page.items.iter().map(move |item| (page, item)))
            .filter(|(page, item)| include_adult || !is_adult_content(item, &page.key, Some(&entry)))
            .filter(|(_, item)| filters.matches(item))
            .map(|(_, item)| item.clone())
            .collect();
        Ok(items)
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Drop every cached page of a category, e.g. after its files changed.
    pub fn invalidate_category(&self, category_id: &str) -> usize {
        let removed = self.cache.invalidate(category_id);
        info!(category = %category_id, pages = removed, "Invalidated category");
        removed
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
