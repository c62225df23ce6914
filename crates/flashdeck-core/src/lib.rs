//! Flashdeck Core - Card Model and Collaborator Interfaces
//!
//! This crate provides the foundational types of the flashcard engine and the
//! interfaces through which it reaches every external system. It contains no
//! engine logic and no I/O beyond parsing the bundled deck.
//!
//! # Contents
//!
//! - **Records**: [`CardRecord`], [`CardKind`], [`Origin`], [`ProgressRecord`]
//! - **Identity**: [`CardId`] and the per-kind [`IdAliases`] registry
//! - **Errors**: the unified [`DeckError`]
//! - **Collaborators**: [`effects`] traits for storage, remote store, bridge,
//!   auth signal and clock
//! - **Plumbing**: [`SnapshotFeed`] subscriptions and the same-device
//!   [`ChangeChannel`]
//! - **Content**: the bundled [`StaticContent`] deck

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod card;
pub mod content;
pub mod effects;
pub mod errors;
pub mod feed;
pub mod ids;
pub mod notify;
pub mod progress;

pub use card::{
    CardDraft, CardKind, CardMetadata, CardPermissions, CardRecord, CardUpdate, Origin,
    PrivateList, ScriptureRef, Visibility,
};
pub use content::StaticContent;
pub use effects::{
    AuthSignal, BridgeSource, Clock, Credential, KeyValueStorage, ReclassifyReport, RemoteStore,
    StorageError,
};
pub use errors::{DeckError, Result};
pub use feed::{FeedSender, SnapshotFeed};
pub use ids::{CardId, IdAlias, IdAliases};
pub use notify::{ChangeChannel, ChangeEvent, ChangeTopic, ObserverId};
pub use progress::ProgressRecord;
