//! Mock shard source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::loader::ShardKey;
use crate::source::{ShardSource, SourceError};

/// A recorded read for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRead {
    /// `None` for index reads.
    pub key: Option<ShardKey>,
    /// When the read started.
    pub timestamp: Instant,
}

/// Mock implementation of the ShardSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve in-memory index and shard bytes
/// - Delay individual shards to simulate slow storage
/// - Fail the next read of a shard or of the index
/// - Track reads for assertions
///
/// Clones share state, so a test can keep one handle while the catalog owns another.
///
/// # Example
///
/// ```rust,ignore
/// use shardcat_core::testing::{MockShardSource, fixtures};
///
/// let source = MockShardSource::new();
/// source.set_index_json(&fixtures::index_json(&[
///     fixtures::CategorySpec::new("netflix", "Netflix", 8000).pages(2),
/// ])).await;
/// source.add_page("netflix", 1, 2, fixtures::items("n1", 5000)).await;
///
/// let catalog = Catalog::new(&Config::default(), Arc::new(source.clone()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockShardSource {
    index: Arc<RwLock<Option<Vec<u8>>>>,
    shards: Arc<RwLock<HashMap<ShardKey, Vec<u8>>>>,
    latencies: Arc<RwLock<HashMap<ShardKey, Duration>>>,
    index_error: Arc<RwLock<Option<SourceError>>>,
    shard_errors: Arc<RwLock<HashMap<ShardKey, SourceError>>>,
    reads: Arc<RwLock<Vec<RecordedRead>>>,
}

impl MockShardSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the raw index bytes.
    pub async fn set_index(&self, bytes: Vec<u8>) {
        *self.index.write().await = Some(bytes);
    }

    /// Set the index from a JSON value.
    pub async fn set_index_json(&self, value: &serde_json::Value) {
        self.set_index(value.to_string().into_bytes()).await;
    }

    /// Add raw shard bytes.
    pub async fn add_shard(&self, key: &ShardKey, bytes: Vec<u8>) {
        self.shards.write().await.insert(key.clone(), bytes);
    }

    /// Add a shard from a JSON value.
    pub async fn add_shard_json(&self, key: &ShardKey, value: &serde_json::Value) {
        self.add_shard(key, value.to_string().into_bytes()).await;
    }

    /// Add a wrapped series page for a category.
    pub async fn add_page(
        &self,
        category_id: &str,
        page: u32,
        total_pages: u32,
        items: Vec<crate::loader::CatalogItem>,
    ) {
        let value = super::fixtures::shard_json(category_id, page, total_pages, vec![], items);
        self.add_shard_json(&ShardKey::new(category_id, page), &value)
            .await;
    }

    /// Remove a shard, as if the file disappeared.
    pub async fn remove_shard(&self, key: &ShardKey) {
        self.shards.write().await.remove(key);
    }

    /// Delay every read of `key`.
    pub async fn set_latency(&self, key: &ShardKey, latency: Duration) {
        self.latencies.write().await.insert(key.clone(), latency);
    }

    /// Fail the next read of `key` with `error`.
    pub async fn fail_next_read(&self, key: &ShardKey, error: SourceError) {
        self.shard_errors.write().await.insert(key.clone(), error);
    }

    /// Fail the next index read with `error`.
    pub async fn fail_next_index(&self, error: SourceError) {
        *self.index_error.write().await = Some(error);
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// All recorded reads, in order.
    pub async fn recorded_reads(&self) -> Vec<RecordedRead> {
        self.reads.read().await.clone()
    }

    /// Number of reads of `key`.
    pub async fn read_count(&self, key: &ShardKey) -> usize {
        self.reads
            .read()
            .await
            .iter()
            .filter(|r| r.key.as_ref() == Some(key))
            .count()
    }

    /// Number of index reads.
    pub async fn index_read_count(&self) -> usize {
        self.reads
            .read()
            .await
            .iter()
            .filter(|r| r.key.is_none())
            .count()
    }
}

#[async_trait]
impl ShardSource for MockShardSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read_index(&self) -> Result<Vec<u8>, SourceError> {
        self.reads.write().await.push(RecordedRead {
            key: None,
            timestamp: Instant::now(),
        });

        if let Some(error) = self.index_error.write().await.take() {
            return Err(error);
        }

        self.index
            .read()
            .await
            .clone()
            .ok_or_else(|| SourceError::NotFound("index.json".to_string()))
    }

    async fn read_shard(&self, key: &ShardKey) -> Result<Vec<u8>, SourceError> {
        self.reads.write().await.push(RecordedRead {
            key: Some(key.clone()),
            timestamp: Instant::now(),
        });

        let latency = self.latencies.read().await.get(key).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.shard_errors.write().await.remove(key) {
            return Err(error);
        }

        self.shards
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}
