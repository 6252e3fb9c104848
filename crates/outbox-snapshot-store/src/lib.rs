//! Durable snapshot storage for the chat outbox.
//!
//! A small string-keyed get/set abstraction with two backends:
//! - [`FileSnapshotStore`]: one JSON document per key on disk, written
//!   atomically through a temp file.
//! - [`MemorySnapshotStore`]: in-memory map for tests and ephemeral use.

mod file;
mod memory;
mod traits;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use traits::SnapshotStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters the backend cannot represent
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StorageError>;
