//! Typed local storage
//!
//! Wraps a [`KeyValueStorage`] with JSON encoding and the engine's key layout.
//! Reads never fail: a missing key and a value that no longer parses both read
//! as absent, the latter with a warning, so a corrupted entry degrades to an
//! empty list instead of taking the engine down.

use std::fmt;
use std::sync::Arc;

use flashdeck_core::{CardRecord, KeyValueStorage, PrivateList, ProgressRecord, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// One-shot migrations whose completion is remembered on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Imported-lexicon content has been reclassified remotely
    LexiconReclassified,
    /// Progress from the retired apps has been merged
    LegacyProgressMerged,
}

impl Marker {
    fn name(self) -> &'static str {
        match self {
            Self::LexiconReclassified => "lexicon-reclassified",
            Self::LegacyProgressMerged => "legacy-progress-merged",
        }
    }
}

/// Storage key layout under a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    /// Layout rooted at `namespace`.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    /// Key of a cached private list.
    pub fn cards(&self, list: PrivateList) -> String {
        format!("{}/cards/{}", self.namespace, list.name())
    }

    /// Key of the public collection cache.
    pub fn public_cards(&self) -> String {
        format!("{}/cards/public", self.namespace)
    }

    /// Key of the progress record.
    pub fn progress(&self) -> String {
        format!("{}/progress", self.namespace)
    }

    /// Key of a migration marker.
    pub fn marker(&self, marker: Marker) -> String {
        format!("{}/migrations/{}", self.namespace, marker.name())
    }
}

/// JSON view over device-local storage.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn KeyValueStorage>,
    keys: StorageKeys,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore").field("keys", &self.keys).finish()
    }
}

impl LocalStore {
    /// Store over `storage` with keys under `namespace`.
    pub fn new(storage: Arc<dyn KeyValueStorage>, namespace: &str) -> Self {
        Self {
            storage,
            keys: StorageKeys::new(namespace),
        }
    }

    /// Key layout in use.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    // ─── Raw typed access ───

    /// Read and decode `key`. Missing, unreadable and corrupt values read as
    /// `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.storage.retrieve(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "local read failed; treating as absent");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "corrupt local value; treating as absent");
                None
            }
        }
    }

    /// Encode and write `value` under `key`.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.storage.store(key, bytes).await?;
        Ok(())
    }

    /// Delete `key`. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.storage.remove(key).await?)
    }

    // ─── Card lists ───

    /// Cached cards of `list`. Lists that are never cached read as empty.
    pub async fn cards(&self, list: PrivateList) -> Vec<CardRecord> {
        if !list.is_locally_cached() {
            return Vec::new();
        }
        self.get(&self.keys.cards(list)).await.unwrap_or_default()
    }

    /// Replace the cached cards of `list`. No-op for lists that are never
    /// cached.
    pub async fn set_cards(&self, list: PrivateList, cards: &[CardRecord]) -> Result<()> {
        if !list.is_locally_cached() {
            return Ok(());
        }
        self.set(&self.keys.cards(list), cards).await
    }

    /// Cached public collection.
    pub async fn public_cards(&self) -> Vec<CardRecord> {
        self.get(&self.keys.public_cards()).await.unwrap_or_default()
    }

    /// Replace the cached public collection.
    pub async fn set_public_cards(&self, cards: &[CardRecord]) -> Result<()> {
        self.set(&self.keys.public_cards(), cards).await
    }

    // ─── Progress ───

    /// Stored progress, empty when absent.
    pub async fn progress(&self) -> ProgressRecord {
        self.get(&self.keys.progress()).await.unwrap_or_default()
    }

    /// Replace stored progress.
    pub async fn set_progress(&self, progress: &ProgressRecord) -> Result<()> {
        self.set(&self.keys.progress(), progress).await
    }

    // ─── Migration markers ───

    /// Whether `marker` has been recorded on this device.
    pub async fn has_marker(&self, marker: Marker) -> bool {
        self.get::<bool>(&self.keys.marker(marker))
            .await
            .unwrap_or(false)
    }

    /// Record `marker`.
    pub async fn set_marker(&self, marker: Marker) -> Result<()> {
        self.set(&self.keys.marker(marker), &true).await
    }

    /// Forget `marker`, making its migration eligible again.
    pub async fn clear_marker(&self, marker: Marker) -> Result<bool> {
        self.remove(&self.keys.marker(marker)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::CardKind;
    use flashdeck_testkit::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, LocalStore) {
        let storage = Arc::new(MemoryStorage::new());
        let local = LocalStore::new(storage.clone(), "flashcards");
        (storage, local)
    }

    #[test]
    fn key_layout() {
        let keys = StorageKeys::new("/flashcards/");
        assert_eq!(keys.cards(PrivateList::Custom), "flashcards/cards/custom");
        assert_eq!(keys.public_cards(), "flashcards/cards/public");
        assert_eq!(keys.progress(), "flashcards/progress");
        assert_eq!(
            keys.marker(Marker::LexiconReclassified),
            "flashcards/migrations/lexicon-reclassified"
        );
    }

    #[tokio::test]
    async fn cards_round_trip() {
        let (_, local) = store();
        let cards = vec![CardRecord::new("custom-1", CardKind::UserDefined, "a", "b")];
        local.set_cards(PrivateList::Custom, &cards).await.unwrap();
        assert_eq!(local.cards(PrivateList::Custom).await, cards);
        assert!(local.cards(PrivateList::Scripture).await.is_empty());
    }

    #[tokio::test]
    async fn lexicon_is_never_cached() {
        let (storage, local) = store();
        let cards = vec![CardRecord::new("lexicon-1", CardKind::ImportedLexicon, "a", "b")];
        local.set_cards(PrivateList::Lexicon, &cards).await.unwrap();
        assert!(local.cards(PrivateList::Lexicon).await.is_empty());
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_reads_as_absent() {
        let (storage, local) = store();
        storage.put_raw("flashcards/cards/custom", b"{not json".to_vec());
        storage.put_raw("flashcards/progress", b"[1, 2".to_vec());
        assert!(local.cards(PrivateList::Custom).await.is_empty());
        assert!(local.progress().await.is_empty());
    }

    #[tokio::test]
    async fn markers() {
        let (_, local) = store();
        assert!(!local.has_marker(Marker::LegacyProgressMerged).await);
        local.set_marker(Marker::LegacyProgressMerged).await.unwrap();
        assert!(local.has_marker(Marker::LegacyProgressMerged).await);
        assert!(!local.has_marker(Marker::LexiconReclassified).await);
        assert!(local.clear_marker(Marker::LegacyProgressMerged).await.unwrap());
        assert!(!local.has_marker(Marker::LegacyProgressMerged).await);
    }

    #[tokio::test]
    async fn failed_write_surfaces_as_storage_error() {
        let (storage, local) = store();
        storage.fail_writes(true);
        let err = local
            .set_progress(&ProgressRecord::with_mastered(["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, flashdeck_core::DeckError::Storage { .. }));
    }
}
