//! Filesystem catalog integration tests.
//!
//! Shard files are laid out on disk the way the producer writes them and
//! read back through `Catalog::from_config`.

use std::path::Path;

use tempfile::TempDir;

use shardcat_core::{
    load_config_from_str, testing::fixtures, Catalog, CatalogError, ContentType, SearchFilters,
    SessionState, MOVIES_PAGE,
};

fn write(dir: &Path, name: &str, value: &serde_json::Value) {
    std::fs::write(dir.join(name), value.to_string()).expect("write shard file");
}

/// A catalog directory with one paginated, one single-page and one adult category.
fn catalog_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path();

    write(
        root,
        "index.json",
        &fixtures::index_json(&[
            fixtures::CategorySpec::new("netflix", "Netflix", 5)
                .counts(0, 5, 0)
                .pages(2),
            fixtures::CategorySpec::new("acao", "Ação", 2),
            fixtures::CategorySpec::new("adultos", "Adultos", 1).counts(0, 0, 1),
        ]),
    );
    write(
        root,
        "netflix_p1.json",
        &fixtures::shard_json(
            "Netflix",
            1,
            2,
            vec![],
            vec![
                fixtures::series("s1", "Dark S01E01"),
                fixtures::series("s2", "Dark S01E02"),
                fixtures::series("s3", "Narcos S01E01"),
            ],
        ),
    );
    write(
        root,
        "netflix_p2.json",
        &fixtures::shard_json(
            "Netflix",
            2,
            2,
            vec![],
            vec![
                fixtures::series("s4", "Narcos S01E02"),
                fixtures::series("s5", "Ozark S01E01"),
            ],
        ),
    );
    // Legacy bare-array shard for a single-page category.
    write(
        root,
        "acao.json",
        &fixtures::legacy_shard_json(vec![
            fixtures::enriched(fixtures::movie("a1", "Heat"), 8.3, &["Action", "Crime"]),
            fixtures::movie("a2", "Ronin"),
        ]),
    );
    write(
        root,
        "adultos_adult.json",
        &fixtures::adult_shard_json("Adultos", vec![fixtures::adult("x1", "Hidden")]),
    );
    dir
}

fn catalog_for(root: &Path, max_cached_shards: usize) -> Catalog {
    let toml = format!(
        r#"
[catalog]
root = "{}"

[cache]
max_cached_shards = {}
"#,
        root.display().to_string().replace('\\', "/"),
        max_cached_shards
    );
    let config = load_config_from_str(&toml).expect("valid config");
    Catalog::from_config(&config)
}

#[tokio::test]
async fn test_browse_paginated_category_from_disk() {
    let dir = catalog_dir();
    let catalog = catalog_for(dir.path(), 5);
    let index = catalog.initialize().await.unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.version(), 2);

    let ids: Vec<_> = catalog
        .categories(false)
        .unwrap()
        .into_iter()
        .map(|c| c.category_id)
        .collect();
    assert_eq!(ids, vec!["netflix", "acao"]);

    let first = catalog.select_category("netflix").await.unwrap();
    assert_eq!(first.len(), 3);
    let all = catalog.load_more().await.unwrap();
    let names: Vec<_> = all.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Dark S01E01",
            "Dark S01E02",
            "Narcos S01E01",
            "Narcos S01E02",
            "Ozark S01E01"
        ]
    );
    assert_eq!(catalog.session().state, SessionState::Exhausted);
}

#[tokio::test]
async fn test_single_page_category_falls_back_to_plain_file() {
    let dir = catalog_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();

    let view = catalog.select_category("acao").await.unwrap();
    assert_eq!(view.len(), 2);
    let rating = view.get(0).unwrap().rating().unwrap();
    assert!((rating - 8.3).abs() < 1e-4);
    assert_eq!(catalog.session().state, SessionState::Exhausted);

    let action = catalog
        .filter_category("acao", &SearchFilters::default().genre("action"))
        .unwrap();
    assert_eq!(action.len(), 1);
    assert_eq!(action[0].id, "a1");
}

#[tokio::test]
async fn test_adult_items_load_outside_pagination() {
    let dir = catalog_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();

    assert_eq!(catalog.categories(true).unwrap().len(), 3);
    let page = catalog.load_adult("adultos").await.unwrap();
    assert_eq!(page.len(), 1);
    assert!(page.items[0].is_adult);
    assert_eq!(catalog.session().state, SessionState::Idle);

    let hidden = catalog.search("hidden", &SearchFilters::default()).unwrap();
    assert!(hidden.items.is_empty());
    let shown = catalog
        .search("hidden", &SearchFilters::default().include_adult(true))
        .unwrap();
    assert_eq!(shown.items.len(), 1);
}

#[tokio::test]
async fn test_missing_and_corrupt_files() {
    let dir = catalog_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();

    std::fs::write(dir.path().join("acao.json"), b"[{\"id\": ").unwrap();
    let err = catalog.select_category("acao").await.unwrap_err();
    assert!(matches!(err, CatalogError::ShardDecode { .. }));

    std::fs::remove_file(dir.path().join("netflix_p2.json")).unwrap();
    catalog.select_category("netflix").await.unwrap();
    // The index promised a second page that is gone: treated as the end.
    let view = catalog.load_more().await.unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(catalog.session().state, SessionState::Exhausted);

    let empty = TempDir::new().unwrap();
    let missing = catalog_for(empty.path(), 5);
    assert!(matches!(
        missing.initialize().await.unwrap_err(),
        CatalogError::IndexMissing(_)
    ));
}

/// Paginated categories keep their movies in a separate `<id>_movies.json`.
fn movies_shard_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path();

    write(
        root,
        "index.json",
        &fixtures::index_json(&[
            fixtures::CategorySpec::new("lancamentos", "Lançamentos", 2)
                .counts(2, 0, 0)
                .pages(1)
                .movies_file(),
            fixtures::CategorySpec::new("netflix", "Netflix", 3)
                .counts(1, 2, 0)
                .pages(1)
                .movies_file(),
        ]),
    );
    write(
        root,
        "lancamentos_movies.json",
        &serde_json::json!({
            "category": "Lançamentos",
            "movies": [fixtures::movie("m1", "Dune Part Two"), fixtures::movie("m2", "Civil War")],
            "series": [],
        }),
    );
    write(
        root,
        "netflix_p1.json",
        &fixtures::shard_json(
            "Netflix",
            1,
            1,
            vec![],
            vec![
                fixtures::series("s1", "Dark S01E01"),
                fixtures::series("s2", "Dark S01E02"),
            ],
        ),
    );
    write(
        root,
        "netflix_movies.json",
        &serde_json::json!({
            "category": "Netflix",
            "movies": [fixtures::movie("m9", "The Irishman")],
            "series": [],
        }),
    );
    dir
}

#[tokio::test]
async fn test_movies_only_category_reads_movies_file() {
    let dir = movies_shard_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();

    let entry = catalog.category("lancamentos").unwrap();
    assert!(entry.has_movies);
    assert_eq!(entry.page_count, 1);

    let view = catalog.select_category("lancamentos").await.unwrap();
    let ids: Vec<_> = view.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert!(view.iter().all(|i| i.content_type == ContentType::Movie));
    assert_eq!(catalog.session().state, SessionState::Exhausted);
}

#[tokio::test]
async fn test_movies_file_follows_series_pages() {
    let dir = movies_shard_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();

    let first = catalog.select_category("netflix").await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(catalog.session().total_pages, 2);
    assert_eq!(catalog.session().state, SessionState::Ready);

    let all = catalog.load_more().await.unwrap();
    let ids: Vec<_> = all.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "m9"]);
    assert_eq!(catalog.session().state, SessionState::Exhausted);

    let hits = catalog.search("irishman", &SearchFilters::default()).unwrap();
    assert_eq!(hits.items.len(), 1);
    assert_eq!(hits.items[0].category_id, "netflix");
    assert_eq!(hits.items[0].page, MOVIES_PAGE);
}

#[tokio::test]
async fn test_search_over_resident_disk_pages() {
    let dir = catalog_dir();
    let catalog = catalog_for(dir.path(), 5);
    catalog.initialize().await.unwrap();
    catalog.select_category("netflix").await.unwrap();
    catalog.load_more().await.unwrap();

    let results = catalog
        .search(
            "narcos",
            &SearchFilters::default().content_type(ContentType::Series),
        )
        .unwrap();
    let ids: Vec<_> = results.items.iter().map(|h| h.item.id.as_str()).collect();
    assert_eq!(ids, vec!["s3", "s4"]);
    assert_eq!(results.items[1].page, 2);

    let movies = catalog
        .search(
            "narcos",
            &SearchFilters::default().content_type(ContentType::Movie),
        )
        .unwrap();
    assert!(movies.items.is_empty());
}
