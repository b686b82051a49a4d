//! Error types for shard loading.

use thiserror::Error;

use super::types::ShardKey;

/// Errors that can occur while fetching or decoding a shard.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShardError {
    /// No shard exists for the key (e.g. page past the end of the category).
    #[error("Shard not found: {key}")]
    NotFound { key: ShardKey },

    /// The shard payload is not a valid shard document.
    #[error("Failed to decode shard {key}: {message}")]
    Decode { key: ShardKey, message: String },

    /// Reading the shard failed. Safe to retry.
    #[error("I/O error reading shard {key}: {message}")]
    Io { key: ShardKey, message: String },

    /// The decode task panicked or was aborted.
    #[error("Decode task for shard {key} failed: {message}")]
    Worker { key: ShardKey, message: String },
}

impl ShardError {
    /// The key of the shard that failed.
    pub fn key(&self) -> &ShardKey {
        match self {
            Self::NotFound { key }
            | Self::Decode { key, .. }
            | Self::Io { key, .. }
            | Self::Worker { key, .. } => key,
        }
    }

    /// Whether retrying the same key may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Worker { .. })
    }

    /// Short label used for metrics and session state.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Decode { .. } => "decode",
            Self::Io { .. } => "io",
            Self::Worker { .. } => "worker",
        }
    }
}
