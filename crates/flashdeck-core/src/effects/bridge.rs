//! Bridge to the sibling lexicon module
//!
//! The lexicon module owns imported vocabulary while the user is anonymous.
//! Only its narrow CRUD + subscribe surface is visible here.

use async_trait::async_trait;

use crate::card::{CardRecord, CardUpdate};
use crate::errors::Result;
use crate::feed::SnapshotFeed;
use crate::ids::CardId;

/// CRUD plus subscription for imported-lexicon cards.
#[async_trait]
pub trait BridgeSource: Send + Sync {
    /// Every lexicon card.
    async fn get_all(&self) -> Result<Vec<CardRecord>>;

    /// Insert a card.
    async fn add(&self, card: &CardRecord) -> Result<()>;

    /// Update fields of a card.
    async fn update(&self, id: &CardId, fields: &CardUpdate) -> Result<()>;

    /// Delete a card.
    async fn delete(&self, id: &CardId) -> Result<()>;

    /// Full snapshots, one per change. Dropping the feed unsubscribes.
    async fn subscribe(&self) -> Result<SnapshotFeed<Vec<CardRecord>>>;
}
