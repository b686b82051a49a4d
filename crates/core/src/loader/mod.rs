//! Shard loader: fetch one shard and decode it off the caller's task.
//!
//! The loader is stateless. It reads bytes through a [`ShardSource`] and
//! hands decoding to the blocking pool, so a multi-megabyte parse never
//! stalls the task driving the UI. Caching is the cache's job.

mod decode;
mod error;
mod types;

pub use decode::{decode_shard, DecodedShard};
pub use error::ShardError;
pub use types::*;

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::metrics::{SHARD_DECODE_DURATION, SHARD_LOADS};
use crate::source::{ShardSource, SourceError};

/// Fetches and decodes shards.
#[derive(Clone)]
pub struct ShardLoader {
    source: Arc<dyn ShardSource>,
}

impl std::fmt::Debug for ShardLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardLoader")
            .field("source", &self.source.name())
            .finish()
    }
}

impl ShardLoader {
    pub fn new(source: Arc<dyn ShardSource>) -> Self {
        Self { source }
    }

    /// Load the shard for `key`.
    ///
    /// `page_count_hint` is the category's page count from the index, used
    /// when the shard does not carry its own.
    pub async fn load(&self, key: &ShardKey, page_count_hint: u32) -> Result<LoadedPage, ShardError> {
        let started = Instant::now();
        let result = self.load_inner(key, page_count_hint).await;

        match &result {
            Ok(page) => {
                SHARD_LOADS.with_label_values(&["ok"]).inc();
                debug!(
                    shard = %key,
                    items = page.items.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Loaded shard"
                );
            }
            Err(e) => {
                SHARD_LOADS.with_label_values(&[e.kind()]).inc();
                match e {
                    ShardError::NotFound { .. } => debug!(shard = %key, "Shard not found"),
                    _ => warn!(shard = %key, error = %e, "Shard load failed"),
                }
            }
        }

        result
    }

    async fn load_inner(&self, key: &ShardKey, page_count_hint: u32) -> Result<LoadedPage, ShardError> {
        let bytes = self
            .source
            .read_shard(key)
            .await
            .map_err(|e| match e {
                SourceError::NotFound(_) => ShardError::NotFound { key: key.clone() },
                SourceError::Io { message, .. } => ShardError::Io {
                    key: key.clone(),
                    message,
                },
            })?;

        let decode_key = key.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let timer = SHARD_DECODE_DURATION.start_timer();
            let result = decode_shard(&decode_key, &bytes);
            timer.observe_duration();
            result
        })
        .await
        .map_err(|e| ShardError::Worker {
            key: key.clone(),
            message: e.to_string(),
        })??;

        if let Some(page) = decoded.page {
            if !key.is_adult() && !key.is_movies() && page != key.page {
                warn!(shard = %key, declared_page = page, "Shard declares a different page number");
            }
        }

        Ok(decoded.into_page(key.clone(), page_count_hint))
    }

    /// Start loading `key` on a separate task.
    ///
    /// The caller owns the handle and decides whether to await it or abort it.
    pub fn spawn(&self, key: ShardKey, page_count_hint: u32) -> LoadHandle {
        let loader = self.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move { loader.load(&task_key, page_count_hint).await });
        LoadHandle { key, task }
    }
}

/// Handle to an in-flight shard load.
///
/// Dropping the handle detaches the task; call [`LoadHandle::abort`] to
/// cancel it.
#[derive(Debug)]
pub struct LoadHandle {
    key: ShardKey,
    task: JoinHandle<Result<LoadedPage, ShardError>>,
}

impl LoadHandle {
    pub fn key(&self) -> &ShardKey {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the load. Awaiting an aborted handle yields a worker error.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the load to finish.
    pub async fn join(self) -> Result<LoadedPage, ShardError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ShardError::Worker {
                key: self.key,
                message: if e.is_cancelled() {
                    "load cancelled".to_string()
                } else {
                    e.to_string()
                },
            }),
        }
    }
}
