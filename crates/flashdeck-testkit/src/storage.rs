//! In-memory key/value storage

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use flashdeck_core::{KeyValueStorage, StorageError};
use parking_lot::RwLock;
use serde::Serialize;

/// Key/value storage held in a map, with write-failure injection.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent store/remove fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Write raw bytes, bypassing failure injection.
    pub fn put_raw(&self, key: &str, value: Vec<u8>) {
        self.data.write().insert(key.to_string(), value);
    }

    /// Write a JSON value, bypassing failure injection.
    pub fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = serde_json::to_vec(value).expect("test value serializes");
        self.put_raw(key, bytes);
    }

    /// Decode the value under `key` as JSON.
    pub fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        self.data
            .read()
            .get(key)
            .map(|bytes| serde_json::from_slice(bytes).expect("stored value is JSON"))
    }

    /// Whether `key` holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.check_writable()?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.check_writable()?;
        Ok(self.data.write().remove(key).is_some())
    }
}
