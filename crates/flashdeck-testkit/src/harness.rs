//! Engine harness
//!
//! Owns one set of in-memory collaborators. Every engine opened from the same
//! harness shares them, which is how a device with several views behaves.

use std::sync::Arc;
use std::time::Duration;

use flashdeck_core::{CardRecord, ChangeChannel, Credential, IdAliases, ProgressRecord, StaticContent};
use flashdeck_effects::SharedCredentialSignal;
use flashdeck_sync::{EngineBuilder, EngineConfig, FlashcardEngine, LocalStore};

use crate::bridge::MemoryBridge;
use crate::clock::ManualClock;
use crate::fixtures::small_deck;
use crate::remote::MemoryRemoteStore;
use crate::storage::MemoryStorage;

/// Shared collaborators plus engine construction.
pub struct TestHarness {
    /// Device-local storage
    pub storage: Arc<MemoryStorage>,
    /// Remote document store
    pub remote: Arc<MemoryRemoteStore>,
    /// Lexicon bridge
    pub bridge: Arc<MemoryBridge>,
    /// Auth signal
    pub auth: SharedCredentialSignal,
    /// Clock
    pub clock: Arc<ManualClock>,
    /// Change channel shared by every engine
    pub changes: ChangeChannel,
    /// Bundled deck
    pub content: StaticContent,
    /// Engine configuration
    pub config: EngineConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Fresh collaborators, a two-card bundled deck and an auth poll slow
    /// enough that tests drive transitions with
    /// [`FlashcardEngine::refresh_auth`].
    pub fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            remote: Arc::new(MemoryRemoteStore::new()),
            bridge: Arc::new(MemoryBridge::new()),
            auth: SharedCredentialSignal::new(),
            clock: Arc::new(ManualClock::default()),
            changes: ChangeChannel::default(),
            content: small_deck(&["native-1", "native-2"]),
            config: EngineConfig::default().with_auth_poll_interval(Duration::from_secs(3600)),
        }
    }

    /// Same collaborators with a different configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder wired to this harness's collaborators.
    pub fn builder(&self) -> EngineBuilder {
        FlashcardEngine::builder(self.config.clone())
            .storage(self.storage.clone())
            .remote(self.remote.clone())
            .bridge(self.bridge.clone())
            .auth(Arc::new(self.auth.clone()))
            .clock(self.clock.clone())
            .changes(self.changes.clone())
            .content(self.content.clone())
            .aliases(IdAliases::default())
    }

    /// Open an engine and wait for its open-time background work.
    pub async fn open(&self) -> FlashcardEngine {
        let engine = self.builder().open().await.expect("engine opens");
        engine.settle().await;
        engine
    }

    /// Typed view of the shared local storage.
    pub fn local(&self) -> LocalStore {
        LocalStore::new(self.storage.clone(), &self.config.storage_namespace)
    }

    /// Put a credential in the auth slot.
    pub fn sign_in(&self) {
        self.auth.sign_in(Credential::new("test-token"));
    }

    /// Clear the auth slot.
    pub fn sign_out(&self) {
        self.auth.sign_out();
    }
}

/// How long [`wait_for_cards`] and [`wait_for_progress`] wait before failing.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Wait until the engine's view satisfies `condition`.
///
/// Panics after [`WAIT_LIMIT`].
pub async fn wait_for_cards<F>(engine: &FlashcardEngine, condition: F)
where
    F: FnMut(&Vec<CardRecord>) -> bool,
{
    let mut view = engine.subscribe_cards();
    let reached = matches!(
        tokio::time::timeout(WAIT_LIMIT, view.wait_for(condition)).await,
        Ok(Ok(_))
    );
    assert!(reached, "view never reached the expected state: {:?}", engine.cards());
}

/// Wait until the engine's progress satisfies `condition`.
///
/// Panics after [`WAIT_LIMIT`].
pub async fn wait_for_progress<F>(engine: &FlashcardEngine, condition: F)
where
    F: FnMut(&ProgressRecord) -> bool,
{
    let mut progress = engine.subscribe_progress();
    let reached = matches!(
        tokio::time::timeout(WAIT_LIMIT, progress.wait_for(condition)).await,
        Ok(Ok(_))
    );
    assert!(reached, "progress never reached the expected state: {:?}", engine.progress());
}
