//! In-memory lexicon bridge

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use flashdeck_core::{
    BridgeSource, CardId, CardRecord, CardUpdate, DeckError, FeedSender, Result, SnapshotFeed,
};
use parking_lot::Mutex;

/// Bridge double holding the sibling module's lexicon cards.
#[derive(Debug, Default)]
pub struct MemoryBridge {
    cards: Mutex<Vec<CardRecord>>,
    feeds: Mutex<Vec<FeedSender<Vec<CardRecord>>>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryBridge {
    /// Empty bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge holding `cards`.
    pub fn with_cards(cards: Vec<CardRecord>) -> Self {
        let bridge = Self::default();
        *bridge.cards.lock() = cards;
        bridge
    }

    /// Replace the cards as if the sibling module changed them.
    pub fn replace(&self, cards: Vec<CardRecord>) {
        *self.cards.lock() = cards;
        self.broadcast();
    }

    /// Current cards.
    pub fn cards(&self) -> Vec<CardRecord> {
        self.cards.lock().clone()
    }

    /// Fail every call.
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeckError::remote("injected bridge failure"));
        }
        Ok(())
    }

    fn broadcast(&self) {
        let snapshot = self.cards();
        self.feeds.lock().retain(|feed| feed.send(snapshot.clone()));
    }
}

#[async_trait]
impl BridgeSource for MemoryBridge {
    async fn get_all(&self) -> Result<Vec<CardRecord>> {
        self.record()?;
        Ok(self.cards())
    }

    async fn add(&self, card: &CardRecord) -> Result<()> {
        self.record()?;
        self.cards.lock().push(card.clone());
        self.broadcast();
        Ok(())
    }

    async fn update(&self, id: &CardId, fields: &CardUpdate) -> Result<()> {
        self.record()?;
        if let Some(card) = self.cards.lock().iter_mut().find(|card| &card.id == id) {
            card.apply(fields);
        }
        self.broadcast();
        Ok(())
    }

    async fn delete(&self, id: &CardId) -> Result<()> {
        self.record()?;
        self.cards.lock().retain(|card| &card.id != id);
        self.broadcast();
        Ok(())
    }

    async fn subscribe(&self) -> Result<SnapshotFeed<Vec<CardRecord>>> {
        self.record()?;
        let (sender, feed) = SnapshotFeed::channel();
        self.feeds.lock().push(sender);
        Ok(feed)
    }
}
