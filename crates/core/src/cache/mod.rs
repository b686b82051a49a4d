//! Bounded cache of loaded shards.
//!
//! [`ShardCache`] keeps at most `max_cached_shards` pages resident, evicting
//! the least recently used page first. A single mutex guards the LRU map
//! and its order list; it is held only for the map update, never across a
//! load or decode. Evicted pages are dropped after the lock is released.
//!
//! The resident gauge is shared by every cache in the process; each cache
//! adds and subtracts its own changes so the gauge reports the sum.

mod lru;

pub use lru::LruCache;

use prometheus::IntGauge;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::loader::{LoadedPage, ShardError, ShardKey, ShardLoader};
use crate::metrics::{CACHE_EVICTIONS, CACHE_HITS, CACHE_MISSES, CACHE_RESIDENT};

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Pages currently resident.
    pub resident: usize,
    /// Maximum resident pages.
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// LRU cache of loaded pages keyed by [`ShardKey`].
#[derive(Debug)]
pub struct ShardCache {
    entries: Mutex<LruCache<ShardKey, Arc<LoadedPage>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    resident_gauge: IntGauge,
}

impl ShardCache {
    /// Create a cache holding at most `max_cached_shards` pages.
    pub fn new(max_cached_shards: usize) -> Self {
        Self::with_resident_gauge(max_cached_shards, CACHE_RESIDENT.clone())
    }

    fn with_resident_gauge(max_cached_shards: usize, resident_gauge: IntGauge) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(max_cached_shards)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            resident_gauge,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ShardKey, Arc<LoadedPage>>> {
        // Poison is ignored: no mutation spans a panic point.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a page, marking it most recently used on a hit.
    pub fn get(&self, key: &ShardKey) -> Option<Arc<LoadedPage>> {
        let found = self.lock().get(key).cloned();
        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                CACHE_HITS.inc();
                debug!(shard = %key, "Cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CACHE_MISSES.inc();
                debug!(shard = %key, "Cache miss");
            }
        }
        found
    }

    /// Whether `key` is resident. Does not touch recency.
    pub fn contains(&self, key: &ShardKey) -> bool {
        self.lock().contains(key)
    }

    /// Insert or overwrite a page, evicting least recently used pages past the bound.
    pub fn put(&self, key: ShardKey, page: Arc<LoadedPage>) {
        debug_assert_eq!(key, page.key, "page stored under a foreign key");

        let (evicted, before, resident, capacity) = {
            let mut entries = self.lock();
            let before = entries.len();
            let evicted = entries.put(key, page);
            (evicted, before, entries.len(), entries.capacity())
        };
        debug_assert!(resident <= capacity, "cache bound exceeded");

        self.resident_gauge.add(resident as i64 - before as i64);
        if !evicted.is_empty() {
            self.evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            CACHE_EVICTIONS.inc_by(evicted.len() as u64);
            for (key, page) in &evicted {
                debug!(shard = %key, items = page.items.len(), "Evicted shard");
            }
        }
        // `evicted` drops here, outside the lock.
    }

    /// Return the cached page or load it through `loader` and cache it.
    ///
    /// The lock is not held while loading. Two concurrent misses for the
    /// same key may both load; the second insert overwrites the first, so
    /// the key is still present only once.
    pub async fn get_or_load(
        &self,
        loader: &ShardLoader,
        key: &ShardKey,
        page_count_hint: u32,
    ) -> Result<Arc<LoadedPage>, ShardError> {
        if let Some(page) = self.get(key) {
            return Ok(page);
        }
        let page = Arc::new(loader.load(key, page_count_hint).await?);
        self.put(key.clone(), Arc::clone(&page));
        Ok(page)
    }

    /// Drop every page of a category. Returns how many were removed.
    pub fn invalidate(&self, category_id: &str) -> usize {
        let removed = self.lock().remove_where(|k| k.category_id == category_id);
        self.resident_gauge.sub(removed.len() as i64);
        if !removed.is_empty() {
            info!(category = %category_id, pages = removed.len(), "Invalidated category");
        }
        removed.len()
    }

    /// Drop every page.
    pub fn clear(&self) {
        let drained: Vec<_> = {
            let mut entries = self.lock();
            let mut drained = Vec::with_capacity(entries.len());
            while let Some(entry) = entries.pop_front() {
                drained.push(entry);
            }
            drained
        };
        self.resident_gauge.sub(drained.len() as i64);
        debug!(pages = drained.len(), "Cleared shard cache");
    }

    /// Snapshot of resident pages, least recently used first. Does not touch recency.
    pub fn resident_pages(&self) -> Vec<Arc<LoadedPage>> {
        self.lock().iter().map(|(_, page)| Arc::clone(page)).collect()
    }

    /// Resident keys, least recently used first.
    pub fn resident_keys(&self) -> Vec<ShardKey> {
        self.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn stats(&self) -> CacheStats {
        let (resident, capacity) = {
            let entries = self.lock();
            (entries.len(), entries.capacity())
        };
        CacheStats {
            resident,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ShardCache {
    fn drop(&mut self) {
        let resident = self
            .entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        self.resident_gauge.sub(resident as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockShardSource};

    fn page(category: &str, n: u32) -> Arc<LoadedPage> {
        Arc::new(fixtures::loaded_page(
            ShardKey::new(category, n),
            fixtures::items(&format!("{}-{}", category, n), 2),
            3,
        ))
    }

    #[test]
    fn test_lru_eviction_keeps_recently_read_page() {
        let cache = ShardCache::new(2);
        let a = ShardKey::new("a", 1);
        let b = ShardKey::new("b", 1);
        let c = ShardKey::new("c", 1);

        cache.put(a.clone(), page("a", 1));
        cache.put(b.clone(), page("b", 1));
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), page("c", 1));

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_bound_holds_after_every_put() {
        let cache = ShardCache::new(3);
        for i in 1..=20 {
            let category = format!("cat{}", i % 7);
            cache.put(ShardKey::new(category.clone(), 1), page(&category, 1));
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_same_key_is_stored_once() {
        let cache = ShardCache::new(4);
        let key = ShardKey::new("a", 1);
        cache.put(key.clone(), page("a", 1));
        cache.put(key.clone(), page("a", 1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.resident_keys(), vec![key]);
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ShardCache::new(2);
        let key = ShardKey::new("a", 1);
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), page("a", 1));
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.resident, 1);
        assert_eq!(stats.capacity, 2);
    }

    #[test]
    fn test_invalidate_category() {
        let cache = ShardCache::new(5);
        cache.put(ShardKey::new("a", 1), page("a", 1));
        cache.put(ShardKey::new("a", 2), page("a", 2));
        cache.put(ShardKey::new("b", 1), page("b", 1));

        assert_eq!(cache.invalidate("a"), 2);
        assert_eq!(cache.resident_keys(), vec![ShardKey::new("b", 1)]);
        assert_eq!(cache.invalidate("missing"), 0);
    }

    #[test]
    fn test_clear() {
        let cache = ShardCache::new(5);
        cache.put(ShardKey::new("a", 1), page("a", 1));
        cache.put(ShardKey::new("b", 1), page("b", 1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resident_gauge_sums_caches() {
        let gauge = IntGauge::new("test_resident", "test").unwrap();
        let first = ShardCache::with_resident_gauge(2, gauge.clone());
        let second = ShardCache::with_resident_gauge(3, gauge.clone());

        first.put(ShardKey::new("a", 1), page("a", 1));
        first.put(ShardKey::new("a", 2), page("a", 2));
        first.put(ShardKey::new("a", 3), page("a", 3));
        first.put(ShardKey::new("a", 3), page("a", 3));
        second.put(ShardKey::new("b", 1), page("b", 1));
        second.put(ShardKey::new("c", 1), page("c", 1));
        assert_eq!(gauge.get(), 4);

        second.invalidate("b");
        assert_eq!(gauge.get(), 3);
        first.clear();
        assert_eq!(gauge.get(), 1);
        drop(second);
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn test_evicted_page_is_released() {
        let cache = ShardCache::new(1);
        let first = page("a", 1);
        let weak = Arc::downgrade(&first);
        cache.put(ShardKey::new("a", 1), first);
        cache.put(ShardKey::new("b", 1), page("b", 1));
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_resident_pages_do_not_touch_recency() {
        let cache = ShardCache::new(2);
        cache.put(ShardKey::new("a", 1), page("a", 1));
        cache.put(ShardKey::new("b", 1), page("b", 1));
        assert_eq!(cache.resident_pages().len(), 2);
        cache.put(ShardKey::new("c", 1), page("c", 1));
        assert!(!cache.contains(&ShardKey::new("a", 1)));
    }

    #[test]
    fn test_concurrent_puts_respect_bound() {
        let cache = Arc::new(ShardCache::new(4));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let category = format!("t{}-{}", t, i % 6);
                        cache.put(ShardKey::new(category.clone(), 1), page(&category, 1));
                        assert!(cache.len() <= 4);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_get_or_load_fills_cache_once() {
        let source = MockShardSource::new();
        let key = ShardKey::first("acao");
        source
            .add_shard_json(&key, &fixtures::legacy_shard_json(fixtures::items("a", 3)))
            .await;
        let loader = ShardLoader::new(Arc::new(source.clone()));
        let cache = ShardCache::new(2);

        let first = cache.get_or_load(&loader, &key, 1).await.unwrap();
        let second = cache.get_or_load(&loader, &key, 1).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.read_count(&key).await, 1);
    }

    #[tokio::test]
    async fn test_get_or_load_does_not_cache_failures() {
        let source = MockShardSource::new();
        let key = ShardKey::first("missing");
        let loader = ShardLoader::new(Arc::new(source.clone()));
        let cache = ShardCache::new(2);

        assert!(cache.get_or_load(&loader, &key, 1).await.is_err());
        assert!(cache.is_empty());
    }
}
