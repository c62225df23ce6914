//! Optimistic mutations
//!
//! Every mutation follows the same protocol:
//!
//! 1. apply the change to in-memory state and recompute the view
//! 2. persist locally where the affected list is locally owned
//! 3. hand the remote write to [`EngineInner::detach`] without waiting
//! 4. announce the change on the change channel
//!
//! A remote failure is logged and never rolls back the in-memory change.
//! Publishing is the one operation that waits on the remote: the private
//! copy is only removed after the public copy exists.

use std::collections::BTreeMap;
use std::sync::Arc;

use flashdeck_core::{
    CardDraft, CardId, CardKind, CardRecord, CardUpdate, ChangeTopic, DeckError, Origin,
    PrivateList, Result,
};
use tracing::{debug, info, warn};

use crate::engine::{EngineInner, FlashcardEngine};

/// Where writes to a private list go in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Home {
    /// Device-local storage only
    Local,
    /// The sibling lexicon module
    Bridge,
    /// The remote private collection
    Remote,
}

impl EngineInner {
    fn home(&self, list: PrivateList) -> Home {
        if self.state.read().is_authenticated() {
            Home::Remote
        } else if list == PrivateList::Lexicon {
            Home::Bridge
        } else {
            Home::Local
        }
    }

    /// Write a private list to local storage when it is locally owned.
    async fn persist_list(&self, list: PrivateList) {
        if self.home(list) != Home::Local {
            return;
        }
        let cards = self.state.read().list(list).to_vec();
        if let Err(err) = self.local.set_cards(list, &cards).await {
            warn!(%list, error = %err, "failed to persist cards locally");
        }
    }

    async fn persist_public(&self) {
        let public = self.state.read().public.clone();
        if let Err(err) = self.local.set_public_cards(&public).await {
            warn!(error = %err, "failed to persist public cache");
        }
    }

    /// Persist progress, mirror it remotely when signed in, announce it.
    ///
    /// Before remote progress has been adopted after a sign-in, the change
    /// stays local; adoption unions it into the remote record.
    async fn sync_progress(&self) {
        let (progress, mirror_remotely) = {
            let state = self.state.read();
            (
                state.progress.clone(),
                state.is_authenticated() && state.progress_adopted,
            )
        };
        self.publish_progress();
        self.persist_progress(&progress).await;
        if mirror_remotely {
            let remote = Arc::clone(&self.remote);
            self.detach("update_progress", async move {
                remote.update_progress(&progress).await
            });
        }
        self.announce(ChangeTopic::Progress);
    }

    /// Propagate freshly inserted private records.
    async fn sync_inserted(&self, inserted: BTreeMap<PrivateList, Vec<CardRecord>>) {
        for (list, cards) in inserted {
            self.persist_list(list).await;
            match self.home(list) {
                Home::Local => {}
                Home::Bridge => {
                    for card in cards {
                        let bridge = Arc::clone(&self.bridge);
                        self.detach("bridge_add", async move { bridge.add(&card).await });
                    }
                }
                Home::Remote => {
                    let remote = Arc::clone(&self.remote);
                    match <[CardRecord; 1]>::try_from(cards) {
                        Ok([card]) => {
                            self.detach("add", async move { remote.add(&card).await });
                        }
                        Err(cards) => {
                            self.detach("add_batch", async move { remote.add_batch(&cards).await });
                        }
                    }
                }
            }
        }
        self.announce(ChangeTopic::Cards);
    }

    /// Insert validated records into their private lists, skipping ids that
    /// are already present. Returns what was inserted, grouped by list.
    fn insert_private(&self, cards: Vec<CardRecord>) -> BTreeMap<PrivateList, Vec<CardRecord>> {
        let mut inserted: BTreeMap<PrivateList, Vec<CardRecord>> = BTreeMap::new();
        {
            let mut state = self.state.write();
            for card in cards {
                if let Err(err) = card.validate() {
                    warn!(id = %card.id, error = %err, "skipping invalid card");
                    continue;
                }
                let Some(list) = card.private_list() else {
                    warn!(id = %card.id, kind = ?card.kind, "skipping card without a private list");
                    continue;
                };
                if state.list(list).iter().any(|existing| existing.id == card.id) {
                    debug!(id = %card.id, %list, "skipping duplicate card");
                    continue;
                }
                let card = card.with_origin(Origin::Private);
                state.list_mut(list).push(card.clone());
                inserted.entry(list).or_default().push(card);
            }
        }
        if !inserted.is_empty() {
            self.publish_view();
        }
        inserted
    }
}

impl FlashcardEngine {
    /// Flip whether `id` is mastered. Returns the new state.
    ///
    /// Progress is persisted locally in both modes and mirrored remotely
    /// when signed in. Unknown ids are accepted.
    pub async fn toggle_mastered(&self, id: &CardId) -> bool {
        let inner = &self.inner;
        let now = inner.clock.now();
        let mastered = inner.state.write().progress.toggle(id, now);
        inner.sync_progress().await;
        debug!(%id, mastered, "toggled mastery");
        mastered
    }

    /// Add records to their private lists, keeping their ids.
    ///
    /// Records that fail validation, have no private list (bundled kinds) or
    /// whose id is already present are skipped with a log line. Returns the
    /// records that were added.
    pub async fn add_cards(&self, cards: Vec<CardRecord>) -> Vec<CardRecord> {
        let requested = cards.len();
        let inserted = self.inner.insert_private(cards);
        let added: Vec<CardRecord> = inserted.values().flatten().cloned().collect();
        if !inserted.is_empty() {
            self.inner.sync_inserted(inserted).await;
        }
        info!(requested, added = added.len(), "cards added");
        added
    }

    /// Create one card from `draft`. The kind defaults to user-defined.
    ///
    /// The id is generated as `{kindPrefix}-{millis}` and bumped until it is
    /// unused.
    pub async fn add_single(&self, draft: CardDraft, kind: Option<CardKind>) -> Result<CardRecord> {
        draft.validate()?;
        let kind = kind.unwrap_or_default();
        let list = kind.private_list().ok_or_else(|| {
            DeckError::invalid(format!("{kind:?} cards are bundled and cannot be added"))
        })?;

        let inner = &self.inner;
        let card = {
            let mut state = inner.state.write();
            let mut millis = inner.clock.now_millis();
            let mut id = CardId::generated(kind, millis);
            while state.contains(&id) {
                millis += 1;
                id = CardId::generated(kind, millis);
            }
            let card = CardRecord::from_draft(id, kind, draft);
            state.list_mut(list).push(card.clone());
            card
        };
        inner.publish_view();
        inner
            .sync_inserted(BTreeMap::from([(list, vec![card.clone()])]))
            .await;
        info!(id = %card.id, %list, "card created");
        Ok(card)
    }

    /// Apply a partial update to a private card. Returns whether a card was
    /// updated.
    pub async fn update_fields(&self, id: &CardId, update: CardUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Err(err) = update.validate() {
            warn!(%id, error = %err, "rejecting invalid update");
            return false;
        }

        let inner = &self.inner;
        let found = {
            let mut state = inner.state.write();
            PrivateList::ALL.into_iter().find(|list| {
                match state.list_mut(*list).iter_mut().find(|card| &card.id == id) {
                    Some(card) => {
                        card.apply(&update);
                        true
                    }
                    None => false,
                }
            })
        };
        let Some(list) = found else {
            debug!(%id, "no private card to update");
            return false;
        };
        inner.publish_view();
        inner.persist_list(list).await;

        let id = id.clone();
        match inner.home(list) {
            Home::Local => {}
            Home::Bridge => {
                let bridge = Arc::clone(&inner.bridge);
                inner.detach("bridge_update", async move { bridge.update(&id, &update).await });
            }
            Home::Remote => {
                let remote = Arc::clone(&inner.remote);
                inner.detach("update", async move { remote.update(&id, &update).await });
            }
        }
        inner.announce(ChangeTopic::Cards);
        true
    }

    /// Delete a card by id, routed by the origin of the record found.
    ///
    /// Private records are removed from their list and their home; public
    /// records are removed from the public collection. Returns the origin of
    /// the deleted record, or `None` when nothing matched.
    pub async fn delete_by_id(&self, id: &CardId) -> Option<Origin> {
        let inner = &self.inner;
        let Some(found) = inner.state.read().locate(id) else {
            debug!(%id, "nothing to delete");
            return None;
        };

        match (found.record.origin, found.list) {
            (Origin::Private, Some(list)) => {
                inner
                    .state
                    .write()
                    .list_mut(list)
                    .retain(|card| &card.id != id);
                inner.publish_view();
                inner.persist_list(list).await;

                let id = id.clone();
                match inner.home(list) {
                    Home::Local => {}
                    Home::Bridge => {
                        let bridge = Arc::clone(&inner.bridge);
                        inner.detach("bridge_delete", async move { bridge.delete(&id).await });
                    }
                    Home::Remote => {
                        let remote = Arc::clone(&inner.remote);
                        inner.detach("delete", async move { remote.delete(&id).await });
                    }
                }
            }
            _ => {
                inner.state.write().public.retain(|card| &card.id != id);
                inner.publish_view();
                inner.persist_public().await;

                let remote = Arc::clone(&inner.remote);
                let id = id.clone();
                inner.detach("delete_public", async move { remote.delete_public(&id).await });
            }
        }
        inner.announce(ChangeTopic::Cards);
        Some(found.record.origin)
    }

    /// Move a private card into the public collection.
    ///
    /// Copies the card's content to the public collection, then deletes the
    /// private record. If the copy fails the private record is kept and
    /// `false` is returned.
    pub async fn publish(&self, card: &CardRecord) -> bool {
        let inner = &self.inner;
        if card.origin != Origin::Private {
            debug!(id = %card.id, "card is already public");
            return false;
        }

        let public = match inner.remote.publish(card.kind, &card.draft()).await {
            Ok(public) => public.with_origin(Origin::Public),
            Err(err) => {
                warn!(id = %card.id, error = %err, "publish failed; private copy kept");
                return false;
            }
        };

        {
            let mut state = inner.state.write();
            state.public.retain(|existing| existing.id != public.id);
            state.public.push(public.clone());
        }
        inner.publish_view();
        inner.persist_public().await;

        self.delete_by_id(&card.id).await;
        info!(private = %card.id, public = %public.id, "card published");
        true
    }

    /// Clear every mastered id and the practice timestamp.
    pub async fn reset_progress(&self) {
        self.inner.state.write().progress.reset();
        self.inner.sync_progress().await;
        info!("progress reset");
    }
}
