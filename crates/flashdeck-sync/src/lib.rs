//! Flashdeck Sync - Reconciliation Engine
//!
//! Combines the bundled deck, the user's private lists and the shared public
//! collection into one deduplicated view, follows the auth signal between
//! anonymous (device-local) and authenticated (remote) wiring, runs one-shot
//! data migrations and applies optimistic mutations.
//!
//! # Modules
//!
//! - [`reconcile`]: the pure merge and visibility filter
//! - [`engine`]: [`FlashcardEngine`] lifecycle and views
//! - [`migrations`]: local upload, lexicon reclassification, legacy merge
//! - [`local`]: typed local storage and key layout
//! - [`config`]: [`EngineConfig`]
//!
//! # Example
//!
//! ```ignore
//! let engine = FlashcardEngine::builder(EngineConfig::default())
//!     .storage(storage)
//!     .remote(remote)
//!     .bridge(bridge)
//!     .auth(auth)
//!     .open()
//!     .await?;
//!
//! let card = engine.add_single(CardDraft::new("hola", "hello"), None).await?;
//! engine.toggle_mastered(&card.id).await;
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod local;
pub mod migrations;
mod mutations;
pub mod reconcile;
pub mod state;
mod tasks;
mod wiring;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, FlashcardEngine};
pub use local::{LocalStore, Marker, StorageKeys};
pub use migrations::{
    LegacyApp, LegacyMergeReport, LocalSnapshot, MigrationRunner, ReclassifyOutcome,
    UploadReport,
};
pub use reconcile::{reconcile, Sources};
pub use state::SessionMode;
