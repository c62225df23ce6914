//! Flashcard engine
//!
//! [`FlashcardEngine`] owns the source state, the reconciled view and every
//! listener task. It is opened with [`EngineBuilder::open`] and torn down
//! with [`FlashcardEngine::close`] (or by dropping it).
//!
//! The reconciled view and the progress record are published on
//! [`tokio::sync::watch`] channels; every state change recomputes the view.

use std::future::Future;
use std::sync::Arc;

use flashdeck_core::{
    AuthSignal, BridgeSource, CardRecord, ChangeChannel, ChangeTopic, Clock, DeckError,
    IdAliases, KeyValueStorage, ObserverId, ProgressRecord, RemoteStore, Result, StaticContent,
    Visibility,
};
use flashdeck_effects::SystemClock;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::local::LocalStore;
use crate::migrations::{MigrationGuards, MigrationRunner};
use crate::reconcile::{reconcile, Sources};
use crate::state::{SessionMode, SourceState};
use crate::tasks::{BackgroundTasks, TaskSlots};

// =============================================================================
// Builder
// =============================================================================

/// Collects collaborators and opens a [`FlashcardEngine`].
///
/// Storage, remote store, bridge and auth signal are required. The clock
/// defaults to the system clock, the change channel to a private one, the
/// bundled deck to [`StaticContent::bundled`] and the aliases to
/// [`IdAliases::default`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    storage: Option<Arc<dyn KeyValueStorage>>,
    remote: Option<Arc<dyn RemoteStore>>,
    bridge: Option<Arc<dyn BridgeSource>>,
    auth: Option<Arc<dyn AuthSignal>>,
    clock: Option<Arc<dyn Clock>>,
    changes: Option<ChangeChannel>,
    content: Option<StaticContent>,
    aliases: Option<IdAliases>,
}

impl EngineBuilder {
    /// Builder with `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Device-local key/value storage.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Remote document store.
    #[must_use]
    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Sibling lexicon module.
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn BridgeSource>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Auth signal sampled by the engine.
    #[must_use]
    pub fn auth(mut self, auth: Arc<dyn AuthSignal>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Time source for practice timestamps and generated ids.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Change channel shared with other views on the device.
    #[must_use]
    pub fn changes(mut self, changes: ChangeChannel) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Bundled read-only deck.
    #[must_use]
    pub fn content(mut self, content: StaticContent) -> Self {
        self.content = Some(content);
        self
    }

    /// Identity alias registry.
    #[must_use]
    pub fn aliases(mut self, aliases: IdAliases) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// Validate, merge legacy progress, wire the current auth mode and start
    /// listening.
    ///
    /// Returns once the initial wiring is in place. Sign-in migrations
    /// continue in the background; see [`FlashcardEngine::settle`].
    pub async fn open(self) -> Result<FlashcardEngine> {
        self.config.validate()?;
        let storage = self.storage.ok_or_else(|| missing("storage"))?;
        let remote = self.remote.ok_or_else(|| missing("remote store"))?;
        let bridge = self.bridge.ok_or_else(|| missing("bridge"))?;
        let auth = self.auth.ok_or_else(|| missing("auth signal"))?;

        let state = SourceState::new(self.config.default_visibility);
        let (view, _) = watch::channel(Vec::new());
        let (progress, _) = watch::channel(ProgressRecord::default());
        let inner = Arc::new(EngineInner {
            observer: ObserverId::new(),
            local: LocalStore::new(storage, &self.config.storage_namespace),
            remote,
            bridge,
            auth,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            changes: self.changes.unwrap_or_default(),
            content: self.content.unwrap_or_else(StaticContent::bundled),
            aliases: self.aliases.unwrap_or_default(),
            state: RwLock::new(state),
            view,
            progress,
            slots: TaskSlots::default(),
            background: BackgroundTasks::default(),
            guards: MigrationGuards::default(),
            transition: Mutex::new(()),
            config: self.config,
        });

        inner.publish_view();
        inner.run_legacy_merge().await;
        inner.wire_public().await;
        inner.refresh_auth().await;
        inner.spawn_auth_poller();

        info!(observer = %inner.observer, mode = ?inner.mode(), "flashcard engine opened");
        Ok(FlashcardEngine { inner })
    }
}

fn missing(what: &str) -> DeckError {
    DeckError::config(format!("{what} not configured"))
}

// =============================================================================
// Shared state
// =============================================================================

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) observer: ObserverId,
    pub(crate) local: LocalStore,
    pub(crate) remote: Arc<dyn RemoteStore>,
    pub(crate) bridge: Arc<dyn BridgeSource>,
    pub(crate) auth: Arc<dyn AuthSignal>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) changes: ChangeChannel,
    pub(crate) content: StaticContent,
    pub(crate) aliases: IdAliases,
    pub(crate) state: RwLock<SourceState>,
    view: watch::Sender<Vec<CardRecord>>,
    progress: watch::Sender<ProgressRecord>,
    pub(crate) slots: TaskSlots,
    pub(crate) background: BackgroundTasks,
    pub(crate) guards: MigrationGuards,
    /// Serializes auth transitions
    pub(crate) transition: Mutex<()>,
}

impl EngineInner {
    pub(crate) fn migrations(&self) -> MigrationRunner<'_> {
        MigrationRunner::new(&self.local, self.remote.as_ref(), &self.aliases)
    }

    pub(crate) fn mode(&self) -> SessionMode {
        self.state.read().mode.unwrap_or_default()
    }

    /// Recompute the reconciled view from current state.
    pub(crate) fn publish_view(&self) {
        let cards = {
            let state = self.state.read();
            let lists = state.private_lists();
            let sources = Sources {
                private: &lists,
                static_content: self.content.cards(),
                public: &state.public,
            };
            reconcile(&sources, state.visibility, &self.aliases)
        };
        self.view.send_replace(cards);
    }

    /// Publish the current progress record.
    pub(crate) fn publish_progress(&self) {
        let progress = self.state.read().progress.clone();
        self.progress.send_if_modified(|current| {
            if *current == progress {
                false
            } else {
                *current = progress;
                true
            }
        });
    }

    /// Announce a change made by this engine to other views.
    pub(crate) fn announce(&self, topic: ChangeTopic) {
        self.changes.notify(topic, self.observer);
    }

    /// Run a remote write without waiting for it.
    ///
    /// The write's result is discarded here after logging: the optimistic
    /// in-memory change stands whether or not the remote accepts it.
    pub(crate) fn detach<F>(&self, operation: &'static str, write: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.background.spawn(async move {
            if let Err(err) = write.await {
                warn!(operation, error = %err, "remote write failed; local state kept");
            }
        });
    }

    /// Persist progress locally, logging failure.
    pub(crate) async fn persist_progress(&self, progress: &ProgressRecord) {
        if let Err(err) = self.local.set_progress(progress).await {
            warn!(error = %err, "failed to persist progress");
        }
    }

    fn shutdown(&self) {
        self.slots.abort_all();
        self.guards.reset_for_sign_out();
    }
}

// =============================================================================
// Engine handle
// =============================================================================

/// Client-side flashcard data engine.
///
/// Reconciles the bundled deck, the private lists and the public collection
/// into one view, follows the auth signal, runs one-shot migrations and
/// applies optimistic mutations. Dropping the engine stops every listener.
pub struct FlashcardEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl std::fmt::Debug for FlashcardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashcardEngine")
            .field("observer", &self.inner.observer)
            .field("mode", &self.inner.mode())
            .finish_non_exhaustive()
    }
}

impl FlashcardEngine {
    /// Start building an engine.
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Identity this engine announces changes under.
    pub fn observer(&self) -> ObserverId {
        self.inner.observer
    }

    /// Current reconciled view.
    pub fn cards(&self) -> Vec<CardRecord> {
        self.inner.view.borrow().clone()
    }

    /// Receiver that observes every recomputation of the view.
    pub fn subscribe_cards(&self) -> watch::Receiver<Vec<CardRecord>> {
        self.inner.view.subscribe()
    }

    /// Current progress record.
    pub fn progress(&self) -> ProgressRecord {
        self.inner.progress.borrow().clone()
    }

    /// Receiver that observes progress changes.
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressRecord> {
        self.inner.progress.subscribe()
    }

    /// Number of mastered ids that resolve to a card in the full view.
    pub fn mastered_count(&self) -> usize {
        let state = self.inner.state.read();
        let lists = state.private_lists();
        let sources = Sources {
            private: &lists,
            static_content: self.inner.content.cards(),
            public: &state.public,
        };
        reconcile(&sources, Visibility::All, &self.inner.aliases)
            .iter()
            .filter(|card| state.progress.is_mastered(&card.id))
            .count()
    }

    /// Active visibility filter.
    pub fn visibility(&self) -> Visibility {
        self.inner.state.read().visibility
    }

    /// Change the visibility filter and recompute the view.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.inner.state.write().visibility = visibility;
        self.inner.publish_view();
    }

    /// Whether the current mode's first data has not arrived yet.
    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }

    /// Current session mode.
    pub fn mode(&self) -> SessionMode {
        self.inner.mode()
    }

    /// Sample the auth signal now and rewire if the mode changed.
    ///
    /// The engine also samples on its own every
    /// [`EngineConfig::auth_poll_interval`].
    pub async fn refresh_auth(&self) {
        self.inner.refresh_auth().await;
    }

    /// Wait for every outstanding background job: remote writes, migrations
    /// and post-sign-in reloads.
    pub async fn settle(&self) {
        self.inner.background.settle().await;
    }

    /// Stop every listener, then wait for outstanding remote writes.
    pub async fn close(self) {
        self.inner.shutdown();
        self.inner.background.settle().await;
        info!(observer = %self.inner.observer, "flashcard engine closed");
    }
}

impl Drop for FlashcardEngine {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.slots.abort_all();
        self.background.abort_all();
    }
}
