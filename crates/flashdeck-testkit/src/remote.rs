//! In-memory remote document store
//!
//! Holds a private collection, a public collection and one progress record.
//! Every change pushes a fresh snapshot to live subscribers, the way a
//! real-time document store does. Calls are recorded so tests can assert on
//! network traffic, and failures can be injected for writes or for
//! everything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use flashdeck_core::{
    CardDraft, CardId, CardKind, CardRecord, CardUpdate, DeckError, FeedSender, IdAliases,
    Origin, ProgressRecord, ReclassifyReport, RemoteStore, Result, SnapshotFeed,
};
use parking_lot::Mutex;

/// Remote operations, for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    /// Read of the private collection
    GetAll,
    /// Single insert
    Add,
    /// Batch insert
    AddBatch,
    /// Field update
    Update,
    /// Private delete
    Delete,
    /// Private subscription
    Subscribe,
    /// Read of the public collection
    GetAllPublic,
    /// Public subscription
    SubscribePublic,
    /// Copy into the public collection
    Publish,
    /// Public delete
    DeletePublic,
    /// Progress read
    GetProgress,
    /// Progress write
    UpdateProgress,
    /// Legacy content reclassification
    Reclassify,
}

impl RemoteCall {
    /// Whether the call touches the public collection.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            Self::GetAllPublic | Self::SubscribePublic | Self::Publish | Self::DeletePublic
        )
    }

    fn is_write(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::AddBatch
                | Self::Update
                | Self::Delete
                | Self::Publish
                | Self::DeletePublic
                | Self::UpdateProgress
                | Self::Reclassify
        )
    }
}

#[derive(Default)]
struct RemoteState {
    private: Vec<CardRecord>,
    public: Vec<CardRecord>,
    progress: Option<ProgressRecord>,
    private_feeds: Vec<FeedSender<Vec<CardRecord>>>,
    public_feeds: Vec<FeedSender<Vec<CardRecord>>>,
}

/// Remote store double.
pub struct MemoryRemoteStore {
    state: Mutex<RemoteState>,
    calls: Mutex<HashMap<RemoteCall, usize>>,
    fail_writes: AtomicBool,
    fail_all: AtomicBool,
    silent_private: AtomicBool,
    next_public: AtomicU64,
    aliases: IdAliases,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(RemoteState::default()),
            calls: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            fail_all: AtomicBool::new(false),
            silent_private: AtomicBool::new(false),
            next_public: AtomicU64::new(1),
            aliases: IdAliases::default(),
        }
    }
}

impl std::fmt::Debug for MemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryRemoteStore")
            .field("private", &state.private.len())
            .field("public", &state.public.len())
            .field("has_progress", &state.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryRemoteStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Seeding and inspection ───

    /// Replace the private collection without recording a call.
    pub fn seed_private(&self, cards: Vec<CardRecord>) {
        self.state.lock().private = cards;
        self.broadcast_private();
    }

    /// Replace the public collection without recording a call.
    pub fn seed_public(&self, cards: Vec<CardRecord>) {
        self.state.lock().public = cards
            .into_iter()
            .map(|card| card.with_origin(Origin::Public))
            .collect();
        self.broadcast_public();
    }

    /// Replace the stored progress without recording a call.
    pub fn set_stored_progress(&self, progress: ProgressRecord) {
        self.state.lock().progress = Some(progress);
    }

    /// Current private collection.
    pub fn private_cards(&self) -> Vec<CardRecord> {
        self.state.lock().private.clone()
    }

    /// Current public collection.
    pub fn public_cards(&self) -> Vec<CardRecord> {
        self.state.lock().public.clone()
    }

    /// Stored progress.
    pub fn stored_progress(&self) -> Option<ProgressRecord> {
        self.state.lock().progress.clone()
    }

    // ─── Failure injection ───

    /// Fail every write while keeping reads and subscriptions working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail every call.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Accept private subscriptions but never deliver snapshots on them.
    pub fn silence_private_feed(&self, silent: bool) {
        self.silent_private.store(silent, Ordering::SeqCst);
    }

    // ─── Call accounting ───

    /// Number of recorded calls of one kind.
    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.calls.lock().get(&call).copied().unwrap_or(0)
    }

    /// Number of recorded calls of every kind.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Number of recorded calls that reach per-user data.
    pub fn private_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(call, _)| !call.is_public())
            .map(|(_, count)| count)
            .sum()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: RemoteCall) -> Result<()> {
        *self.calls.lock().entry(call).or_default() += 1;
        if self.fail_all.load(Ordering::SeqCst)
            || (call.is_write() && self.fail_writes.load(Ordering::SeqCst))
        {
            return Err(DeckError::remote(format!("injected failure: {call:?}")));
        }
        Ok(())
    }

    fn broadcast_private(&self) {
        if self.silent_private.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock();
        let snapshot = state.private.clone();
        state.private_feeds.retain(|feed| feed.send(snapshot.clone()));
    }

    fn broadcast_public(&self) {
        let mut state = self.state.lock();
        let snapshot = state.public.clone();
        state.public_feeds.retain(|feed| feed.send(snapshot.clone()));
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_all(&self) -> Result<Vec<CardRecord>> {
        self.record(RemoteCall::GetAll)?;
        Ok(self.private_cards())
    }

    async fn add(&self, card: &CardRecord) -> Result<()> {
        self.record(RemoteCall::Add)?;
        self.state.lock().private.push(card.clone());
        self.broadcast_private();
        Ok(())
    }

    async fn add_batch(&self, cards: &[CardRecord]) -> Result<()> {
        self.record(RemoteCall::AddBatch)?;
        self.state.lock().private.extend(cards.iter().cloned());
        self.broadcast_private();
        Ok(())
    }

    async fn update(&self, id: &CardId, fields: &CardUpdate) -> Result<()> {
        self.record(RemoteCall::Update)?;
        {
            let mut state = self.state.lock();
            let card = state
                .private
                .iter_mut()
                .find(|card| &card.id == id)
                .ok_or_else(|| DeckError::not_found(format!("no private card {id}")))?;
            card.apply(fields);
        }
        self.broadcast_private();
        Ok(())
    }

    async fn delete(&self, id: &CardId) -> Result<()> {
        self.record(RemoteCall::Delete)?;
        self.state.lock().private.retain(|card| &card.id != id);
        self.broadcast_private();
        Ok(())
    }

    async fn subscribe(&self) -> Result<SnapshotFeed<Vec<CardRecord>>> {
        self.record(RemoteCall::Subscribe)?;
        let (sender, feed) = SnapshotFeed::channel();
        let mut state = self.state.lock();
        if !self.silent_private.load(Ordering::SeqCst) {
            sender.send(state.private.clone());
        }
        state.private_feeds.push(sender);
        Ok(feed)
    }

    async fn get_all_public(&self) -> Result<Vec<CardRecord>> {
        self.record(RemoteCall::GetAllPublic)?;
        Ok(self.public_cards())
    }

    async fn subscribe_public(&self) -> Result<SnapshotFeed<Vec<CardRecord>>> {
        self.record(RemoteCall::SubscribePublic)?;
        let (sender, feed) = SnapshotFeed::channel();
        let mut state = self.state.lock();
        sender.send(state.public.clone());
        state.public_feeds.push(sender);
        Ok(feed)
    }

    async fn publish(&self, kind: CardKind, draft: &CardDraft) -> Result<CardRecord> {
        self.record(RemoteCall::Publish)?;
        let n = self.next_public.fetch_add(1, Ordering::SeqCst);
        let card = CardRecord::from_draft(CardId::new(format!("public-{n}")), kind, draft.clone())
            .with_origin(Origin::Public);
        self.state.lock().public.push(card.clone());
        self.broadcast_public();
        Ok(card)
    }

    async fn delete_public(&self, id: &CardId) -> Result<()> {
        self.record(RemoteCall::DeletePublic)?;
        self.state.lock().public.retain(|card| &card.id != id);
        self.broadcast_public();
        Ok(())
    }

    async fn get_progress(&self) -> Result<Option<ProgressRecord>> {
        self.record(RemoteCall::GetProgress)?;
        Ok(self.stored_progress())
    }

    async fn update_progress(&self, progress: &ProgressRecord) -> Result<()> {
        self.record(RemoteCall::UpdateProgress)?;
        self.set_stored_progress(progress.clone());
        Ok(())
    }

    async fn reclassify_legacy_content(&self) -> Result<ReclassifyReport> {
        self.record(RemoteCall::Reclassify)?;
        let reclassified = {
            let mut state = self.state.lock();
            let mut count = 0;
            for card in &mut state.private {
                if card.is_misclassified_lexicon(&self.aliases) {
                    card.kind = CardKind::ImportedLexicon;
                    count += 1;
                }
            }
            count
        };
        if reclassified > 0 {
            self.broadcast_private();
        }
        Ok(ReclassifyReport { reclassified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_every_change() {
        let remote = MemoryRemoteStore::new();
        let mut feed = remote.subscribe().await.unwrap();
        assert_eq!(feed.next().await.unwrap().len(), 0);

        let card = CardRecord::new("custom-1", CardKind::UserDefined, "a", "b");
        remote.add(&card).await.unwrap();
        assert_eq!(feed.next().await.unwrap(), vec![card]);
    }

    #[tokio::test]
    async fn injected_write_failure_still_counts() {
        let remote = MemoryRemoteStore::new();
        remote.fail_writes(true);
        assert!(remote.update_progress(&ProgressRecord::default()).await.is_err());
        assert!(remote.get_progress().await.is_ok());
        assert_eq!(remote.call_count(RemoteCall::UpdateProgress), 1);
        assert_eq!(remote.total_calls(), 2);
    }

    #[tokio::test]
    async fn reclassify_is_idempotent() {
        let remote = MemoryRemoteStore::new();
        remote.seed_private(vec![CardRecord::new("vocab-2", CardKind::UserDefined, "a", "b")]);
        assert_eq!(remote.reclassify_legacy_content().await.unwrap().reclassified, 1);
        assert_eq!(remote.reclassify_legacy_content().await.unwrap().reclassified, 0);
    }
}
