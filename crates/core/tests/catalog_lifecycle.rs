//! Catalog lifecycle integration tests.
//!
//! These tests drive the facade end to end over an in-memory shard source:
//! initialize -> select category -> load more -> exhausted, plus category
//! switches, retries and eviction under a small cache bound.

use std::sync::Arc;
use std::time::Duration;

use shardcat_core::{
    decode_shard,
    testing::{fixtures, MockShardSource},
    Catalog, CatalogError, Config, SearchFilters, SessionState, ShardKey, SourceError,
};

/// Test helper wiring a catalog to a mock source.
struct TestHarness {
    source: MockShardSource,
    catalog: Arc<Catalog>,
}

impl TestHarness {
    async fn new(categories: &[fixtures::CategorySpec], max_cached_shards: usize) -> Self {
        let source = MockShardSource::new();
        source.set_index_json(&fixtures::index_json(categories)).await;

        let mut config = Config::default();
        config.cache.max_cached_shards = max_cached_shards;
        let catalog = Arc::new(Catalog::new(&config, Arc::new(source.clone())));
        catalog.initialize().await.expect("index should load");

        Self { source, catalog }
    }

    /// Add `sizes.len()` pages for `category`, items named `{category}-p{page}-{i}`.
    async fn add_pages(&self, category: &str, sizes: &[usize]) {
        let total = sizes.len() as u32;
        for (i, size) in sizes.iter().enumerate() {
            let page = i as u32 + 1;
            self.source
                .add_page(
                    category,
                    page,
                    total,
                    fixtures::items(&format!("{}-p{}", category, page), *size),
                )
                .await;
        }
    }

    async fn current_ids(&self) -> Vec<String> {
        self.catalog
            .current_items()
            .await
            .expect("current items")
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }
}

fn expected_ids(category: &str, sizes: &[usize]) -> Vec<String> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(i, size)| (0..*size).map(move |n| format!("{}-p{}-{}", category, i + 1, n)))
        .collect()
}

#[tokio::test]
async fn test_two_page_category_end_to_end() {
    let h = TestHarness::new(
        &[fixtures::CategorySpec::new("netflix", "Netflix", 8000).pages(2)],
        5,
    )
    .await;
    h.add_pages("netflix", &[5000, 3000]).await;

    let first = h.catalog.select_category("netflix").await.unwrap();
    assert_eq!(first.len(), 5000);
    assert_eq!(h.catalog.session().state, SessionState::Ready);

    let all = h.catalog.load_more().await.unwrap();
    assert_eq!(all.len(), 8000);
    assert_eq!(h.catalog.session().state, SessionState::Exhausted);

    let unchanged = h.catalog.load_more().await.unwrap();
    assert_eq!(unchanged.len(), 8000);
    assert_eq!(unchanged.to_vec(), all.to_vec());

    assert_eq!(h.source.read_count(&ShardKey::new("netflix", 3)).await, 0);
    assert_eq!(h.current_ids().await, expected_ids("netflix", &[5000, 3000]));
}

#[tokio::test]
async fn test_three_pages_stay_ordered_under_uneven_latency() {
    let sizes = [7, 5, 3];
    let h = TestHarness::new(
        &[fixtures::CategorySpec::new("novelas", "Novelas", 15).pages(3)],
        5,
    )
    .await;
    h.add_pages("novelas", &sizes).await;
    h.source
        .set_latency(&ShardKey::new("novelas", 2), Duration::from_millis(80))
        .await;
    h.source
        .set_latency(&ShardKey::new("novelas", 3), Duration::from_millis(1))
        .await;

    h.catalog.select_category("novelas").await.unwrap();

    // Hammer load_more concurrently; overlapping calls must not skip ahead.
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let catalog = Arc::clone(&h.catalog);
        tasks.push(tokio::spawn(async move { catalog.load_more().await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    while h.catalog.session().state != SessionState::Exhausted {
        h.catalog.load_more().await.unwrap();
    }

    assert_eq!(h.current_ids().await, expected_ids("novelas", &sizes));

    let reads = h.source.recorded_reads().await;
    let pages: Vec<u32> = reads
        .iter()
        .filter_map(|r| r.key.as_ref())
        .filter(|k| k.category_id == "novelas")
        .map(|k| k.page)
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_late_result_for_abandoned_category_is_discarded() {
    let h = TestHarness::new(
        &[
            fixtures::CategorySpec::new("x", "X", 10),
            fixtures::CategorySpec::new("y", "Y", 4),
        ],
        5,
    )
    .await;
    h.add_pages("x", &[10]).await;
    h.add_pages("y", &[4]).await;
    h.source
        .set_latency(&ShardKey::first("x"), Duration::from_millis(100))
        .await;

    let catalog = Arc::clone(&h.catalog);
    let pending_x = tokio::spawn(async move { catalog.select_category("x").await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    h.catalog.select_category("y").await.unwrap();

    let late = pending_x.await.unwrap();
    assert_eq!(late.unwrap_err(), CatalogError::Superseded("x".into()));

    assert_eq!(h.current_ids().await, expected_ids("y", &[4]));
    let session = h.catalog.session();
    assert_eq!(session.category.as_deref(), Some("y"));
    assert_eq!(session.state, SessionState::Exhausted);
}

#[tokio::test]
async fn test_io_failure_keeps_items_and_retry_matches_first_try() {
    let h = TestHarness::new(
        &[fixtures::CategorySpec::new("doramas", "Doramas", 9).pages(2)],
        5,
    )
    .await;
    h.add_pages("doramas", &[5, 4]).await;
    h.catalog.select_category("doramas").await.unwrap();

    let key = ShardKey::new("doramas", 2);
    h.source
        .fail_next_read(
            &key,
            SourceError::Io {
                path: "doramas_p2.json".into(),
                message: "connection reset".into(),
            },
        )
        .await;

    let err = h.catalog.load_more().await.unwrap_err();
    assert!(matches!(err, CatalogError::ShardIo { .. }));
    assert!(err.is_retryable());
    assert!(matches!(
        h.catalog.session().state,
        SessionState::Error { page: 2, .. }
    ));
    assert_eq!(h.current_ids().await, expected_ids("doramas", &[5]));

    let retried = h.catalog.load_more().await.unwrap();
    assert_eq!(retried.len(), 9);
    assert_eq!(h.catalog.session().state, SessionState::Exhausted);

    // A retried load decodes the same bytes a first try would have.
    let direct = fixtures::shard_json("doramas", 2, 2, vec![], fixtures::items("doramas-p2", 4));
    let decoded = decode_shard(&key, direct.to_string().as_bytes())
        .unwrap()
        .into_page(key.clone(), 2);
    assert_eq!(retried.pages()[1].as_ref(), &decoded);
}

#[tokio::test]
async fn test_cache_bound_holds_while_browsing_many_categories() {
    let categories: Vec<_> = (0..8)
        .map(|i| fixtures::CategorySpec::new(&format!("c{}", i), &format!("C{}", i), 6).pages(2))
        .collect();
    let h = TestHarness::new(&categories, 3).await;
    for i in 0..8 {
        h.add_pages(&format!("c{}", i), &[3, 3]).await;
    }

    for i in 0..8 {
        h.catalog.select_category(&format!("c{}", i)).await.unwrap();
        h.catalog.load_more().await.unwrap();
        assert!(h.catalog.cache_stats().resident <= 3);
    }

    let stats = h.catalog.cache_stats();
    assert_eq!(stats.capacity, 3);
    assert!(stats.evictions >= 13);
}

#[tokio::test]
async fn test_evicted_page_is_reloaded_not_dropped() {
    let h = TestHarness::new(
        &[
            fixtures::CategorySpec::new("long", "Long", 9).pages(3),
            fixtures::CategorySpec::new("other", "Other", 2),
        ],
        2,
    )
    .await;
    h.add_pages("long", &[3, 3, 3]).await;
    h.add_pages("other", &[2]).await;

    h.catalog.select_category("long").await.unwrap();
    h.catalog.load_more().await.unwrap();
    h.catalog.load_more().await.unwrap();
    assert_eq!(h.catalog.session().state, SessionState::Exhausted);

    // Page 1 was evicted by page 3; reading the list brings it back.
    assert_eq!(h.current_ids().await, expected_ids("long", &[3, 3, 3]));
    assert!(h.source.read_count(&ShardKey::first("long")).await >= 2);
}

#[tokio::test]
async fn test_prefetch_warms_next_page() {
    let h = TestHarness::new(
        &[fixtures::CategorySpec::new("netflix", "Netflix", 6).pages(2)],
        5,
    )
    .await;
    h.add_pages("netflix", &[3, 3]).await;

    assert!(!h.catalog.prefetch_next());
    h.catalog.select_category("netflix").await.unwrap();
    assert!(h.catalog.prefetch_next());

    let view = h.catalog.load_more().await.unwrap();
    assert_eq!(view.len(), 6);
    assert_eq!(h.source.read_count(&ShardKey::new("netflix", 2)).await, 1);
    assert!(!h.catalog.prefetch_next());
}

#[tokio::test]
async fn test_legacy_and_wrapped_shards_yield_same_items() {
    let items = vec![
        fixtures::movie("1", "Heat"),
        fixtures::series("2", "Dark"),
        fixtures::movie("3", "Alien"),
    ];
    let h = TestHarness::new(
        &[
            fixtures::CategorySpec::new("legacy", "Legacy", 3),
            fixtures::CategorySpec::new("wrapped", "Wrapped", 3),
        ],
        5,
    )
    .await;
    h.source
        .add_shard_json(
            &ShardKey::first("legacy"),
            &fixtures::legacy_shard_json(items.clone()),
        )
        .await;
    h.source
        .add_shard_json(
            &ShardKey::first("wrapped"),
            &serde_json::json!({ "category": "wrapped", "movies": items.clone() }),
        )
        .await;

    let legacy = h.catalog.select_category("legacy").await.unwrap().to_vec();
    let wrapped = h.catalog.select_category("wrapped").await.unwrap().to_vec();
    assert_eq!(legacy, wrapped);
    assert_eq!(legacy, items);
}

#[tokio::test]
async fn test_search_scope_follows_residency() {
    let h = TestHarness::new(
        &[
            fixtures::CategorySpec::new("a", "Alpha", 2),
            fixtures::CategorySpec::new("b", "Beta", 2),
        ],
        1,
    )
    .await;
    h.source
        .add_page("a", 1, 1, vec![fixtures::movie("a1", "Blade Runner")])
        .await;
    h.source
        .add_page("b", 1, 1, vec![fixtures::movie("b1", "Blade")])
        .await;

    h.catalog.select_category("a").await.unwrap();
    let found = h.catalog.search("blade", &SearchFilters::default()).unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].category_id, "a");

    // Selecting "b" evicts "a" under a bound of one page.
    h.catalog.select_category("b").await.unwrap();
    let found = h.catalog.search("blade", &SearchFilters::default()).unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].category_id, "b");
    assert_eq!(found.scanned_shards, 1);
}

#[tokio::test]
async fn test_index_failures_map_to_catalog_errors() {
    let source = MockShardSource::new();
    source
        .fail_next_index(SourceError::Io {
            path: "index.json".into(),
            message: "permission denied".into(),
        })
        .await;
    let catalog = Catalog::new(&Config::default(), Arc::new(source.clone()));

    let err = catalog.initialize().await.unwrap_err();
    assert!(matches!(err, CatalogError::IndexMissing(_)));
    assert!(err.is_retryable());

    source
        .set_index_json(&serde_json::json!({ "version": 2, "categories": "nope" }))
        .await;
    assert!(matches!(
        catalog.initialize().await.unwrap_err(),
        CatalogError::IndexCorrupt(_)
    ));
    assert!(!catalog.is_initialized());
}
