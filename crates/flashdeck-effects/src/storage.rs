//! Filesystem storage handler
//!
//! Stores each key as one file under a base directory. Keys may contain `/`
//! separators (`flashcards/cards/custom`), which become subdirectories.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use flashdeck_core::{KeyValueStorage, StorageError};
use tokio::fs;

/// Filesystem-based key/value storage for production use.
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    /// Base directory for storage files
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a handler rooted at `base_path`. The directory is created lazily.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Base directory of this handler.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                reason: "Key cannot be empty".to_string(),
            });
        }
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey {
                reason: format!("Key must be a relative path without `..`: {key}"),
            });
        }
        Ok(self.base_path.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl KeyValueStorage for FilesystemStorageHandler {
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file: {e}"
            ))),
        }
    }

    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let file_path = self.file_path(key)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create directory: {e}"))
            })?;
        }

        // Write to a sibling file first so a crash never leaves half a value.
        let staging = file_path.with_extension("dat.tmp");
        fs::write(&staging, value)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write file: {e}")))?;
        fs::rename(&staging, &file_path)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to replace file: {e}")))?;

        tracing::trace!(key, "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove file: {e}"
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;
        fs::try_exists(&file_path)
            .await
            .map_err(|e| StorageError::ReadFailed(format!("Failed to stat file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_retrieve_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::new(dir.path());

        assert_eq!(storage.retrieve("flashcards/progress").await.unwrap(), None);
        storage
            .store("flashcards/progress", b"{}".to_vec())
            .await
            .unwrap();
        assert!(storage.exists("flashcards/progress").await.unwrap());
        assert_eq!(
            storage.retrieve("flashcards/progress").await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(storage.remove("flashcards/progress").await.unwrap());
        assert!(!storage.remove("flashcards/progress").await.unwrap());
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::new(dir.path());
        storage.store("k", b"one".to_vec()).await.unwrap();
        storage.store("k", b"two".to_vec()).await.unwrap();
        assert_eq!(storage.retrieve("k").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorageHandler::new(dir.path());
        assert!(matches!(
            storage.store("../outside", Vec::new()).await,
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(matches!(
            storage.retrieve("").await,
            Err(StorageError::InvalidKey { .. })
        ));
    }
}
