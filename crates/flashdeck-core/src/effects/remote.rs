//! Remote document store
//!
//! Two collections sit behind this trait: the signed-in user's private
//! collection and the shared public collection. The private collection and
//! progress are only reachable with a credential; the public collection can
//! be read anonymously.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::card::{CardDraft, CardKind, CardRecord, CardUpdate};
use crate::errors::Result;
use crate::feed::SnapshotFeed;
use crate::ids::CardId;
use crate::progress::ProgressRecord;

/// Result of the one-time legacy content reclassification RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassifyReport {
    /// Records whose kind was changed
    pub reclassified: usize,
}

/// CRUD plus real-time subscription against the remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ─── Private collection ──────────────────────────────────

    /// Every record in the private collection.
    async fn get_all(&self) -> Result<Vec<CardRecord>>;

    /// Insert one record, keeping its id.
    async fn add(&self, card: &CardRecord) -> Result<()>;

    /// Insert several records, keeping their ids.
    async fn add_batch(&self, cards: &[CardRecord]) -> Result<()>;

    /// Update fields of one record.
    async fn update(&self, id: &CardId, fields: &CardUpdate) -> Result<()>;

    /// Delete one record.
    async fn delete(&self, id: &CardId) -> Result<()>;

    /// Full snapshots of the private collection, one per change.
    ///
    /// Dropping the feed unsubscribes.
    async fn subscribe(&self) -> Result<SnapshotFeed<Vec<CardRecord>>>;

    // ─── Public collection ───────────────────────────────────

    /// Every record in the public collection.
    async fn get_all_public(&self) -> Result<Vec<CardRecord>>;

    /// Full snapshots of the public collection, one per change.
    async fn subscribe_public(&self) -> Result<SnapshotFeed<Vec<CardRecord>>>;

    /// Copy content into the public collection under a fresh id.
    async fn publish(&self, kind: CardKind, draft: &CardDraft) -> Result<CardRecord>;

    /// Delete one public record.
    async fn delete_public(&self, id: &CardId) -> Result<()>;

    // ─── Progress ────────────────────────────────────────────

    /// The user's progress record, if one was ever written.
    async fn get_progress(&self) -> Result<Option<ProgressRecord>>;

    /// Replace the user's progress record.
    async fn update_progress(&self, progress: &ProgressRecord) -> Result<()>;

    // ─── Maintenance ─────────────────────────────────────────

    /// Move legacy lexicon content filed under the wrong kind to
    /// [`CardKind::ImportedLexicon`].
    async fn reclassify_legacy_content(&self) -> Result<ReclassifyReport>;
}
