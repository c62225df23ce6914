//! One-shot data migrations
//!
//! | Job | Trigger | Guard |
//! |-----|---------|-------|
//! | Local upload | each sign-in | in-memory flag, reset on sign-out |
//! | Lexicon reclassification | each sign-in | persisted marker + destination check |
//! | Legacy progress merge | engine open | persisted marker |
//!
//! Every job is idempotent on its own: a rerun after a lost marker finds the
//! destination already converged and does nothing. Jobs return
//! [`Result`]; the engine logs failures and leaves the job eligible to retry.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use flashdeck_core::{
    CardId, CardRecord, IdAliases, Origin, PrivateList, ProgressRecord, RemoteStore, Result,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::local::{LocalStore, Marker};

// =============================================================================
// Reports
// =============================================================================

/// Outcome of the local-to-cloud upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Cards added to the remote private collection
    pub cards_uploaded: usize,
    /// Whether merged progress was written remotely
    pub progress_pushed: bool,
}

/// Outcome of the lexicon reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclassifyOutcome {
    /// The device marker was already set
    AlreadyDone,
    /// Nothing remote needed reclassifying; the marker was set
    NothingPending,
    /// The remote operation ran and the marker was set
    Reclassified {
        /// Records the remote operation touched
        count: usize,
    },
}

/// Outcome of the legacy progress merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMergeReport {
    /// Namespaced ids read from the legacy records
    pub merged_ids: BTreeSet<CardId>,
    /// Ids that were not yet mastered
    pub added: usize,
    /// Legacy apps whose records were found
    pub sources: Vec<LegacyApp>,
    /// The persisted marker was already set
    pub already_done: bool,
}

// =============================================================================
// Legacy records
// =============================================================================

/// Retired single-purpose apps whose progress is folded into the unified
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyApp {
    /// Vocabulary trainer; ids belong to the imported-lexicon scheme
    VocabularyTrainer,
    /// Verse memorizer; ids belong to the scripture scheme
    VerseMemorizer,
}

impl LegacyApp {
    /// Every retired app.
    pub const ALL: [LegacyApp; 2] = [Self::VocabularyTrainer, Self::VerseMemorizer];

    /// Storage key the app wrote its progress under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::VocabularyTrainer => "vocabulary-trainer/progress",
            Self::VerseMemorizer => "verse-memorizer/progress",
        }
    }

    /// Prefix applied to the app's raw ids.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::VocabularyTrainer => "lexicon-",
            Self::VerseMemorizer => "scripture-",
        }
    }
}

/// Progress as a retired app stored it: an object with an id array under
/// one of several names, or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyProgress {
    Object {
        #[serde(
            alias = "mastered",
            alias = "memorized",
            alias = "masteredIds",
            default
        )]
        ids: Vec<LegacyId>,
    },
    Bare(Vec<LegacyId>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyId {
    Number(u64),
    Text(String),
}

impl LegacyProgress {
    fn into_ids(self, app: LegacyApp) -> impl Iterator<Item = CardId> {
        let raw = match self {
            Self::Object { ids } | Self::Bare(ids) => ids,
        };
        raw.into_iter().filter_map(move |id| {
            let raw = match id {
                LegacyId::Number(n) => n.to_string(),
                LegacyId::Text(s) if s.trim().is_empty() => return None,
                LegacyId::Text(s) => s,
            };
            Some(CardId::namespaced(app.id_prefix(), &raw))
        })
    }
}

// =============================================================================
// Guards
// =============================================================================

/// In-memory "already started" flags of the current process.
#[derive(Debug, Default)]
pub(crate) struct MigrationGuards {
    upload: AtomicBool,
    reclassify: AtomicBool,
    legacy_merge: AtomicBool,
}

/// Which guard to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    Upload,
    Reclassify,
    LegacyMerge,
}

impl MigrationGuards {
    fn flag(&self, guard: Guard) -> &AtomicBool {
        match guard {
            Guard::Upload => &self.upload,
            Guard::Reclassify => &self.reclassify,
            Guard::LegacyMerge => &self.legacy_merge,
        }
    }

    /// Claim `guard`. Returns `false` when it was already claimed.
    pub(crate) fn try_start(&self, guard: Guard) -> bool {
        !self.flag(guard).swap(true, Ordering::SeqCst)
    }

    /// Make `guard` claimable again.
    pub(crate) fn release(&self, guard: Guard) {
        self.flag(guard).store(false, Ordering::SeqCst);
    }

    /// Per-authentication jobs run again after the next sign-in.
    pub(crate) fn reset_for_sign_out(&self) {
        self.release(Guard::Upload);
        self.release(Guard::Reclassify);
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Device-local data captured before the remote subscription can overwrite
/// the local cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalSnapshot {
    /// Locally persisted private cards
    pub cards: Vec<CardRecord>,
    /// Locally persisted progress
    pub progress: ProgressRecord,
}

impl LocalSnapshot {
    /// Read the locally cached private lists (scripture and custom) and the
    /// progress record.
    pub async fn read(local: &LocalStore) -> Self {
        let mut cards = Vec::new();
        for list in PrivateList::ALL.into_iter().filter(|list| list.is_locally_cached()) {
            cards.extend(local.cards(list).await);
        }
        Self {
            cards,
            progress: local.progress().await,
        }
    }

    /// Whether there is nothing to migrate.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty() && self.progress.is_empty()
    }
}

/// Runs migration jobs against a local store and a remote store.
pub struct MigrationRunner<'a> {
    local: &'a LocalStore,
    remote: &'a dyn RemoteStore,
    aliases: &'a IdAliases,
}

impl<'a> MigrationRunner<'a> {
    /// Runner over the given collaborators.
    pub fn new(local: &'a LocalStore, remote: &'a dyn RemoteStore, aliases: &'a IdAliases) -> Self {
        Self {
            local,
            remote,
            aliases,
        }
    }

    /// Copy device-local cards and progress into the user's remote
    /// collection.
    ///
    /// Cards whose id already exists remotely are skipped. Progress is pushed
    /// as the union of remote and local, and only when that union differs
    /// from what is stored remotely. Both halves are attempted; the first
    /// error is returned.
    pub async fn upload_local_to_cloud(&self, snapshot: LocalSnapshot) -> Result<UploadReport> {
        let mut report = UploadReport::default();
        if snapshot.is_empty() {
            debug!("no local data to upload");
            return Ok(report);
        }

        let cards = self.upload_cards(snapshot.cards).await;
        let progress = self.push_progress(&snapshot.progress).await;

        report.cards_uploaded = cards?;
        report.progress_pushed = progress?;
        info!(
            cards = report.cards_uploaded,
            progress = report.progress_pushed,
            "local data uploaded"
        );
        Ok(report)
    }

    async fn upload_cards(&self, cards: Vec<CardRecord>) -> Result<usize> {
        if cards.is_empty() {
            return Ok(0);
        }
        let mut known: HashSet<CardId> = self
            .remote
            .get_all()
            .await?
            .into_iter()
            .map(|card| card.id)
            .collect();
        let fresh: Vec<CardRecord> = cards
            .into_iter()
            .filter(|card| known.insert(card.id.clone()))
            .map(|card| card.with_origin(Origin::Private))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        self.remote.add_batch(&fresh).await?;
        Ok(fresh.len())
    }

    async fn push_progress(&self, local: &ProgressRecord) -> Result<bool> {
        if local.is_empty() {
            return Ok(false);
        }
        let remote = self.remote.get_progress().await?.unwrap_or_default();
        let merged = remote.union(local);
        if merged.mastered_ids == remote.mastered_ids {
            return Ok(false);
        }
        self.remote.update_progress(&merged).await?;
        Ok(true)
    }

    /// Move imported-lexicon content filed under another kind into the
    /// imported-lexicon kind.
    ///
    /// The remote collection is checked first; when nothing is misclassified
    /// the remote operation is skipped. The marker is set only after success.
    pub async fn reclassify_lexicon(&self) -> Result<ReclassifyOutcome> {
        if self.local.has_marker(Marker::LexiconReclassified).await {
            return Ok(ReclassifyOutcome::AlreadyDone);
        }

        let pending = self
            .remote
            .get_all()
            .await?
            .iter()
            .filter(|card| card.is_misclassified_lexicon(self.aliases))
            .count();
        let outcome = if pending == 0 {
            ReclassifyOutcome::NothingPending
        } else {
            let report = self.remote.reclassify_legacy_content().await?;
            ReclassifyOutcome::Reclassified {
                count: report.reclassified,
            }
        };

        self.local.set_marker(Marker::LexiconReclassified).await?;
        info!(?outcome, "lexicon reclassification complete");
        Ok(outcome)
    }

    /// Union the retired apps' mastered ids into the stored progress, then
    /// delete their records.
    ///
    /// Runs once per device. Absent legacy records count as success.
    pub async fn merge_legacy_progress(&self) -> Result<LegacyMergeReport> {
        if self.local.has_marker(Marker::LegacyProgressMerged).await {
            return Ok(LegacyMergeReport {
                already_done: true,
                ..LegacyMergeReport::default()
            });
        }

        let mut report = LegacyMergeReport::default();
        for app in LegacyApp::ALL {
            if let Some(record) = self.local.get::<LegacyProgress>(app.storage_key()).await {
                report.merged_ids.extend(record.into_ids(app));
                report.sources.push(app);
            }
        }

        if !report.sources.is_empty() {
            let mut progress = self.local.progress().await;
            report.added = progress.merge_ids(report.merged_ids.iter().cloned());
            self.local.set_progress(&progress).await?;
        }
        for app in LegacyApp::ALL {
            self.local.remove(app.storage_key()).await?;
        }
        self.local.set_marker(Marker::LegacyProgressMerged).await?;

        if report.sources.is_empty() {
            debug!("no legacy progress found");
        } else {
            info!(
                sources = report.sources.len(),
                added = report.added,
                "legacy progress merged"
            );
        }
        Ok(report)
    }
}
