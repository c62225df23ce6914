//! Source wiring per session mode
//!
//! | Mode | Lexicon | Scripture / custom | Progress |
//! |------|---------|--------------------|----------|
//! | Anonymous | bridge | local storage | local storage |
//! | Authenticated | remote private | remote private (mirrored locally) | remote, then local |
//!
//! The public collection is subscribed in both modes and mirrored into the
//! local public cache. Transitions tear down the previous mode's listeners
//! before installing the next mode's.

use std::sync::{Arc, Weak};
use std::time::Duration;

use flashdeck_core::{CardRecord, ChangeEvent, ChangeTopic, PrivateList, SnapshotFeed};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::EngineInner;
use crate::migrations::{Guard, LocalSnapshot};
use crate::state::SessionMode;
use crate::tasks::Slot;

impl EngineInner {
    // ─── Auth transitions ───

    /// Sample the auth signal and rewire when the mode differs from the
    /// wired one.
    pub(crate) async fn refresh_auth(self: &Arc<Self>) {
        let _transition = self.transition.lock().await;
        let target = SessionMode::from_signed_in(self.auth.current_credential().is_some());
        let previous = self.state.read().mode;
        if previous == Some(target) {
            return;
        }

        info!(from = ?previous, to = ?target, "auth mode changed");
        match target {
            SessionMode::Anonymous => self.wire_anonymous(previous).await,
            SessionMode::Authenticated => self.wire_authenticated().await,
        }
    }

    async fn wire_anonymous(self: &Arc<Self>, previous: Option<SessionMode>) {
        self.slots.abort_session();
        if previous == Some(SessionMode::Authenticated) {
            self.guards.reset_for_sign_out();
        }
        {
            let mut state = self.state.write();
            state.mode = Some(SessionMode::Anonymous);
            state.loading = true;
            state.mirror_held = false;
            state.set_list(PrivateList::Lexicon, Vec::new());
        }
        self.publish_view();

        // Listen before reading so a change announced mid-read is not lost.
        self.spawn_change_listener();
        self.reload_local(ChangeTopic::Cards).await;
        self.reload_local(ChangeTopic::Progress).await;

        match self.bridge.get_all().await {
            Ok(cards) => self.apply_lexicon(cards),
            Err(err) => warn!(error = %err, "bridge read failed; lexicon list empty"),
        }
        match self.bridge.subscribe().await {
            Ok(feed) => {
                let handle = tokio::spawn(run_bridge_feed(Arc::downgrade(self), feed));
                self.slots.install(Slot::BridgeFeed, handle);
            }
            Err(err) => warn!(error = %err, "bridge subscription failed"),
        }

        self.state.write().loading = false;
        self.publish_view();
    }

    async fn wire_authenticated(self: &Arc<Self>) {
        self.slots.abort_session();

        // Capture local data before the private mirror can overwrite it.
        let snapshot = if self.guards.try_start(Guard::Upload) {
            Some(LocalSnapshot::read(&self.local).await)
        } else {
            None
        };

        {
            let mut state = self.state.write();
            state.mode = Some(SessionMode::Authenticated);
            state.loading = true;
            state.mirror_held = snapshot.as_ref().is_some_and(|s| !s.cards.is_empty());
            state.progress_adopted = false;
            state.set_list(PrivateList::Lexicon, Vec::new());
        }
        self.publish_view();

        match self.remote.subscribe().await {
            Ok(feed) => {
                let timeout = self.config.private_snapshot_timeout();
                let handle = tokio::spawn(run_private_feed(Arc::downgrade(self), feed, timeout));
                self.slots.install(Slot::PrivateFeed, handle);
            }
            Err(err) => {
                warn!(error = %err, "private subscription failed");
                self.state.write().loading = false;
                self.publish_view();
            }
        }

        let inner = Arc::clone(self);
        self.background.spawn(async move { inner.after_sign_in(snapshot).await });
    }

    /// Upload local data, adopt remote progress, then reclassify.
    async fn after_sign_in(self: Arc<Self>, snapshot: Option<LocalSnapshot>) {
        if let Some(snapshot) = snapshot {
            match self.migrations().upload_local_to_cloud(snapshot).await {
                // Snapshots that follow the upload carry the uploaded cards.
                Ok(_) => self.state.write().mirror_held = false,
                Err(err) => {
                    warn!(error = %err, "local upload failed; will retry after next sign-in");
                }
            }
        }

        self.adopt_remote_progress().await;

        if self.guards.try_start(Guard::Reclassify) {
            if let Err(err) = self.migrations().reclassify_lexicon().await {
                warn!(error = %err, "lexicon reclassification failed; will retry");
                self.guards.release(Guard::Reclassify);
            }
        }
    }

    /// Union remote progress with in-memory progress and make the result
    /// the session's progress.
    ///
    /// In-memory progress holds local ids a failed upload did not push and
    /// toggles made since sign-in; both survive. When the union differs
    /// from the remote record it is written back.
    async fn adopt_remote_progress(&self) {
        let remote = match self.remote.get_progress().await {
            Ok(remote) => remote.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "remote progress read failed; progress stays local");
                return;
            }
        };

        let merged = {
            let mut state = self.state.write();
            if !state.is_authenticated() {
                debug!("signed out before remote progress arrived");
                return;
            }
            let merged = remote.union(&state.progress);
            state.progress = merged.clone();
            state.progress_adopted = true;
            merged
        };
        self.persist_progress(&merged).await;
        self.publish_progress();

        if merged.mastered_ids != remote.mastered_ids {
            if let Err(err) = self.remote.update_progress(&merged).await {
                warn!(error = %err, "failed to push merged progress");
            }
        }
    }

    // ─── Snapshot application ───

    fn apply_lexicon(&self, cards: Vec<CardRecord>) {
        {
            let mut state = self.state.write();
            if state.is_authenticated() {
                return;
            }
            state.set_list(PrivateList::Lexicon, cards);
        }
        self.publish_view();
    }

    /// Partition a private snapshot into the three lists and mirror the
    /// cached lists locally.
    async fn apply_private_snapshot(&self, snapshot: Vec<CardRecord>) {
        let mut lists: [(PrivateList, Vec<CardRecord>); 3] =
            PrivateList::ALL.map(|list| (list, Vec::new()));
        for card in snapshot {
            match card.private_list() {
                Some(target) => {
                    if let Some((_, cards)) = lists.iter_mut().find(|(list, _)| *list == target) {
                        cards.push(card);
                    }
                }
                None => debug!(id = %card.id, "ignoring bundled-kind record in private snapshot"),
            }
        }

        let mirror = {
            let mut state = self.state.write();
            if !state.is_authenticated() {
                return;
            }
            for (list, cards) in &lists {
                state.set_list(*list, cards.clone());
            }
            state.loading = false;
            !state.mirror_held
        };
        self.publish_view();
        if !mirror {
            debug!("local upload pending; private snapshot not mirrored");
            return;
        }

        for (list, cards) in &lists {
            if let Err(err) = self.local.set_cards(*list, cards).await {
                warn!(%list, error = %err, "failed to mirror private snapshot");
            }
        }
    }

    async fn apply_public_snapshot(&self, snapshot: Vec<CardRecord>) {
        let public = {
            let mut state = self.state.write();
            state.set_public(snapshot);
            state.public.clone()
        };
        self.publish_view();
        if let Err(err) = self.local.set_public_cards(&public).await {
            warn!(error = %err, "failed to mirror public snapshot");
        }
    }

    fn finish_loading(&self) {
        let changed = {
            let mut state = self.state.write();
            std::mem::replace(&mut state.loading, false)
        };
        if changed {
            self.publish_view();
        }
    }

    /// Re-read locally persisted data for `topic`.
    pub(crate) async fn reload_local(&self, topic: ChangeTopic) {
        match topic {
            ChangeTopic::Cards => {
                let scripture = self.local.cards(PrivateList::Scripture).await;
                let custom = self.local.cards(PrivateList::Custom).await;
                {
                    let mut state = self.state.write();
                    if state.is_authenticated() {
                        return;
                    }
                    state.set_list(PrivateList::Scripture, scripture);
                    state.set_list(PrivateList::Custom, custom);
                }
                self.publish_view();
            }
            ChangeTopic::Progress => {
                let progress = self.local.progress().await;
                self.state.write().progress = progress;
                self.publish_progress();
            }
        }
    }

    // ─── Standing listeners ───

    /// Load the public cache and subscribe to the public collection.
    pub(crate) async fn wire_public(self: &Arc<Self>) {
        let cached = self.local.public_cards().await;
        if !cached.is_empty() {
            self.state.write().set_public(cached);
            self.publish_view();
        }
        match self.remote.subscribe_public().await {
            Ok(feed) => {
                let handle = tokio::spawn(run_public_feed(Arc::downgrade(self), feed));
                self.slots.install(Slot::PublicFeed, handle);
            }
            Err(err) => warn!(error = %err, "public subscription failed; serving cache"),
        }
    }

    fn spawn_change_listener(self: &Arc<Self>) {
        let receiver = self.changes.subscribe();
        let handle = tokio::spawn(run_change_listener(Arc::downgrade(self), receiver));
        self.slots.install(Slot::ChangeListener, handle);
    }

    pub(crate) fn spawn_auth_poller(self: &Arc<Self>) {
        let period = self.config.auth_poll_interval();
        let handle = tokio::spawn(run_auth_poller(Arc::downgrade(self), period));
        self.slots.install(Slot::AuthPoller, handle);
    }

    /// Fold legacy app progress into the stored record, once per device.
    ///
    /// Runs before the first wiring so the merged ids are part of whatever
    /// that wiring loads or uploads.
    pub(crate) async fn run_legacy_merge(&self) {
        if !self.config.legacy_progress_merge || !self.guards.try_start(Guard::LegacyMerge) {
            return;
        }
        match self.migrations().merge_legacy_progress().await {
            Ok(report) if !report.merged_ids.is_empty() => {
                self.announce(ChangeTopic::Progress);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "legacy progress merge failed; will retry");
                self.guards.release(Guard::LegacyMerge);
            }
        }
    }
}

// =============================================================================
// Listener loops
// =============================================================================

async fn run_private_feed(
    engine: Weak<EngineInner>,
    mut feed: SnapshotFeed<Vec<CardRecord>>,
    timeout: Duration,
) {
    match tokio::time::timeout(timeout, feed.next()).await {
        Ok(Some(snapshot)) => {
            let Some(inner) = engine.upgrade() else { return };
            inner.apply_private_snapshot(snapshot).await;
        }
        Ok(None) => {
            if let Some(inner) = engine.upgrade() {
                inner.finish_loading();
            }
            return;
        }
        Err(_) => {
            debug!(?timeout, "no private snapshot yet; showing what is loaded");
            if let Some(inner) = engine.upgrade() {
                inner.finish_loading();
            }
        }
    }

    while let Some(snapshot) = feed.next().await {
        let Some(inner) = engine.upgrade() else { return };
        inner.apply_private_snapshot(snapshot).await;
    }
    debug!("private feed closed");
}

async fn run_bridge_feed(engine: Weak<EngineInner>, mut feed: SnapshotFeed<Vec<CardRecord>>) {
    while let Some(snapshot) = feed.next().await {
        let Some(inner) = engine.upgrade() else { return };
        inner.apply_lexicon(snapshot);
    }
    debug!("bridge feed closed");
}

async fn run_public_feed(engine: Weak<EngineInner>, mut feed: SnapshotFeed<Vec<CardRecord>>) {
    while let Some(snapshot) = feed.next().await {
        let Some(inner) = engine.upgrade() else { return };
        inner.apply_public_snapshot(snapshot).await;
    }
    debug!("public feed closed");
}

async fn run_change_listener(
    engine: Weak<EngineInner>,
    mut receiver: tokio::sync::broadcast::Receiver<ChangeEvent>,
) {
    loop {
        // `None` means events were missed and everything is re-read.
        let topic = match receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(missed)) => {
                debug!(missed, "change listener lagged; reloading everything");
                None
            }
            Err(RecvError::Closed) => return,
        };
        let Some(inner) = engine.upgrade() else { return };
        match topic {
            Some(event) if event.source == inner.observer => {}
            Some(event) => inner.reload_local(event.topic).await,
            None => {
                inner.reload_local(ChangeTopic::Cards).await;
                inner.reload_local(ChangeTopic::Progress).await;
            }
        }
    }
}

async fn run_auth_poller(engine: Weak<EngineInner>, period: Duration) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; open already sampled.
    ticks.tick().await;
    loop {
        ticks.tick().await;
        let Some(inner) = engine.upgrade() else { return };
        inner.refresh_auth().await;
    }
}
