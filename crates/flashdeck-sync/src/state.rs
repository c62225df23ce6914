//! In-memory source state
//!
//! Everything the reconciler reads, plus the session mode and loading flag.
//! Lives behind one lock in the engine; nothing here performs I/O.

use flashdeck_core::{CardId, CardRecord, Origin, PrivateList, ProgressRecord, Visibility};

/// Which set of collaborators the private lists are wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionMode {
    /// Device-local storage and the bridge
    #[default]
    Anonymous,
    /// The remote private collection
    Authenticated,
}

impl SessionMode {
    /// Mode implied by the presence of a credential.
    pub fn from_signed_in(signed_in: bool) -> Self {
        if signed_in {
            Self::Authenticated
        } else {
            Self::Anonymous
        }
    }
}

/// Where a record was found.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Located {
    pub(crate) list: Option<PrivateList>,
    pub(crate) record: CardRecord,
}

#[derive(Debug, Default)]
pub(crate) struct SourceState {
    custom: Vec<CardRecord>,
    scripture: Vec<CardRecord>,
    lexicon: Vec<CardRecord>,
    pub(crate) public: Vec<CardRecord>,
    pub(crate) progress: ProgressRecord,
    pub(crate) visibility: Visibility,
    /// `None` until the first wiring
    pub(crate) mode: Option<SessionMode>,
    pub(crate) loading: bool,
    /// Local data awaits upload; private snapshots must not overwrite it
    pub(crate) mirror_held: bool,
    /// Remote progress has been merged into `progress` this session. Until
    /// then progress changes stay local.
    pub(crate) progress_adopted: bool,
}

impl SourceState {
    pub(crate) fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            loading: true,
            ..Self::default()
        }
    }

    pub(crate) fn list(&self, list: PrivateList) -> &[CardRecord] {
        match list {
            PrivateList::Custom => &self.custom,
            PrivateList::Scripture => &self.scripture,
            PrivateList::Lexicon => &self.lexicon,
        }
    }

    pub(crate) fn list_mut(&mut self, list: PrivateList) -> &mut Vec<CardRecord> {
        match list {
            PrivateList::Custom => &mut self.custom,
            PrivateList::Scripture => &mut self.scripture,
            PrivateList::Lexicon => &mut self.lexicon,
        }
    }

    /// Replace a private list. Every record is marked private.
    pub(crate) fn set_list(&mut self, list: PrivateList, cards: Vec<CardRecord>) {
        *self.list_mut(list) = with_origin(cards, Origin::Private);
    }

    /// Replace the public list. Every record is marked public.
    pub(crate) fn set_public(&mut self, cards: Vec<CardRecord>) {
        self.public = with_origin(cards, Origin::Public);
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.mode == Some(SessionMode::Authenticated)
    }

    /// Private lists in presentation order.
    pub(crate) fn private_lists(&self) -> [&[CardRecord]; 3] {
        PrivateList::ALL.map(|list| self.list(list))
    }

    /// Find `id`, private lists first.
    pub(crate) fn locate(&self, id: &CardId) -> Option<Located> {
        for list in PrivateList::ALL {
            if let Some(record) = self.list(list).iter().find(|card| &card.id == id) {
                return Some(Located {
                    list: Some(list),
                    record: record.clone(),
                });
            }
        }
        self.public
            .iter()
            .find(|card| &card.id == id)
            .map(|record| Located {
                list: None,
                record: record.clone(),
            })
    }

    /// Whether any private list or the public list holds `id`.
    pub(crate) fn contains(&self, id: &CardId) -> bool {
        PrivateList::ALL
            .iter()
            .any(|list| self.list(*list).iter().any(|card| &card.id == id))
            || self.public.iter().any(|card| &card.id == id)
    }
}

fn with_origin(mut cards: Vec<CardRecord>, origin: Origin) -> Vec<CardRecord> {
    for card in &mut cards {
        card.origin = origin;
    }
    cards
}
