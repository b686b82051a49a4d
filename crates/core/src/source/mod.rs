//! Read-only access to the index and shard artifacts.
//!
//! The shard producer writes a small index file plus one JSON file per
//! category page. A [`ShardSource`] hands back raw bytes; decoding happens
//! in the loader, off the caller's task.

mod fs;

pub use fs::FsShardSource;

use async_trait::async_trait;
use thiserror::Error;

use crate::loader::ShardKey;

/// Errors from reading catalog artifacts.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The artifact exists but could not be read.
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
}

/// Trait for catalog artifact storage.
#[async_trait]
pub trait ShardSource: Send + Sync {
    /// Returns the name of this source, for logging.
    fn name(&self) -> &str;

    /// Read the raw index artifact.
    async fn read_index(&self) -> Result<Vec<u8>, SourceError>;

    /// Read the raw shard for `key`.
    async fn read_shard(&self, key: &ShardKey) -> Result<Vec<u8>, SourceError>;
}
