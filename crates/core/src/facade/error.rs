//! Errors surfaced by the catalog facade.

use thiserror::Error;

use crate::index::IndexError;
use crate::loader::{ShardError, ShardKey};
use crate::pagination::PaginationError;

/// The closed set of failures callers of [`Catalog`](super::Catalog) see.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// The index artifact could not be located or read.
    #[error("Catalog index missing: {0}")]
    IndexMissing(String),

    /// The index artifact is not a valid index document.
    #[error("Catalog index corrupt: {0}")]
    IndexCorrupt(String),

    /// An operation that needs the index ran before `initialize`.
    #[error("Catalog not initialized")]
    NotInitialized,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No category selected")]
    NoActiveCategory,

    #[error("Shard not found: {0}")]
    ShardNotFound(ShardKey),

    /// The shard is malformed. Other categories remain usable.
    #[error("Failed to decode shard {key}: {message}")]
    ShardDecode { key: ShardKey, message: String },

    /// Reading the shard failed. Retrying the same call is safe.
    #[error("Failed to read shard {key}: {message}")]
    ShardIo { key: ShardKey, message: String },

    /// The result belonged to a category that is no longer selected.
    #[error("Category {0} is no longer selected")]
    Superseded(String),
}

impl CatalogError {
    /// Whether the same call may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IndexMissing(_) | Self::IndexCorrupt(_) | Self::ShardIo { .. }
        )
    }

    /// Short label for logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IndexMissing(_) => "index_missing",
            Self::IndexCorrupt(_) => "index_corrupt",
            Self::NotInitialized => "not_initialized",
            Self::UnknownCategory(_) => "unknown_category",
            Self::NoActiveCategory => "no_active_category",
            Self::ShardNotFound(_) => "shard_not_found",
            Self::ShardDecode { .. } => "shard_decode",
            Self::ShardIo { .. } => "shard_io",
            Self::Superseded(_) => "superseded",
        }
    }
}

impl From<IndexError> for CatalogError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Missing(message) => Self::IndexMissing(message),
            IndexError::Corrupt(message) => Self::IndexCorrupt(message),
        }
    }
}

impl From<ShardError> for CatalogError {
    fn from(err: ShardError) -> Self {
        match err {
            ShardError::NotFound { key } => Self::ShardNotFound(key),
            ShardError::Decode { key, message } => Self::ShardDecode { key, message },
            // A failed worker task is reported like a failed read: retrying loads afresh.
            ShardError::Io { key, message } | ShardError::Worker { key, message } => {
                Self::ShardIo { key, message }
            }
        }
    }
}

impl From<PaginationError> for CatalogError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::NoActiveCategory => Self::NoActiveCategory,
            PaginationError::Superseded { category } => Self::Superseded(category),
            PaginationError::Shard(e) => e.into(),
        }
    }
}
