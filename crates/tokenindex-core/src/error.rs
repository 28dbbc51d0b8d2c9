//! Error types for the tokenindex pipeline.

use thiserror::Error;

/// Errors that can occur while mapping events or driving a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("Log index {log_index} does not fit the 32-bit identifier encoding")]
    InvalidLogIndex { log_index: u64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed batch: {reason}")]
    MalformedBatch { reason: String },

    #[error("Failed to decode '{event}' log: {reason}")]
    Decode { event: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexerError {
    /// Returns `true` if the error comes from the store boundary and must
    /// abort the current batch attempt.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Storage(_))
    }

    /// Returns `true` if the error only affects a single event.
    pub fn is_event_local(&self) -> bool {
        matches!(self, Self::InvalidLogIndex { .. } | Self::Decode { .. })
    }
}
