//! Device-persistent key/value storage

use async_trait::async_trait;

use crate::errors::DeckError;

/// Error reported by a storage handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Key rejected by the handler
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },
    /// Read failed
    #[error("Read failed: {0}")]
    ReadFailed(String),
    /// Write failed
    #[error("Write failed: {0}")]
    WriteFailed(String),
    /// Delete failed
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

impl From<StorageError> for DeckError {
    fn from(err: StorageError) -> Self {
        DeckError::storage(err.to_string())
    }
}

/// Raw byte-level key/value storage.
///
/// Values are opaque to the handler; the typed JSON layer sits above it in
/// the engine's local store adapter.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove `key`. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Whether `key` holds a value.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key).await?.is_some())
    }
}
