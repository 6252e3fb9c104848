//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Remote writer error
    #[error("Writer error: {0}")]
    Writer(#[from] conversation_sync_client::ConversationSyncError),

    /// Snapshot storage error
    #[error("Storage error: {0}")]
    Storage(#[from] outbox_snapshot_store::StorageError),

    /// Snapshot serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
