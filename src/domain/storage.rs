//! Storage seam for uploaded file contents.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

/// Errors raised by file storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte storage keyed by an opaque, collision-free key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under a fresh key derived from `original_name`.
    async fn save(&self, original_name: &str, bytes: Bytes) -> Result<String, StorageError>;

    /// Move stored content to a fresh key derived from `new_name`.
    async fn rename(&self, key: &str, new_name: &str) -> Result<String, StorageError>;

    /// Move content back to an exact earlier key, undoing a `rename`.
    async fn restore(&self, key: &str, original_key: &str) -> Result<(), StorageError>;

    /// Delete stored content. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Absolute location of a key, rejecting keys that escape the storage root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError>;
}
