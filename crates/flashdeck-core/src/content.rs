//! Bundled learning content
//!
//! The native-language deck is compiled into the binary and parsed once. It
//! has no private/public distinction and is never written to.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::card::{CardRecord, Origin};
use crate::errors::Result;
use crate::ids::CardId;

const BUNDLED_JSON: &str = include_str!("../data/native_cards.json");

static BUNDLED: Lazy<StaticContent> = Lazy::new(|| match StaticContent::from_json(BUNDLED_JSON) {
    Ok(content) => content,
    Err(err) => {
        tracing::warn!(error = %err, "bundled card data is unreadable; continuing without it");
        StaticContent::default()
    }
});

/// Immutable, build-time card dataset. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    cards: Arc<[CardRecord]>,
}

impl StaticContent {
    /// The dataset compiled into this build.
    pub fn bundled() -> Self {
        BUNDLED.clone()
    }

    /// Dataset from explicit records.
    pub fn new(cards: Vec<CardRecord>) -> Self {
        Self {
            cards: cards
                .into_iter()
                .map(|card| card.with_origin(Origin::Private))
                .collect(),
        }
    }

    /// Parse a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self> {
        let cards: Vec<CardRecord> = serde_json::from_str(json)?;
        Ok(Self::new(cards))
    }

    /// All records in authoring order.
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    /// Look up a record by id.
    pub fn get(&self, id: &CardId) -> Option<&CardRecord> {
        self.cards.iter().find(|card| &card.id == id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use std::collections::HashSet;

    #[test]
    fn bundled_deck_parses_with_unique_ids() {
        let content = StaticContent::bundled();
        assert!(!content.is_empty());
        let ids: HashSet<_> = content.cards().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), content.len());
        assert!(content
            .cards()
            .iter()
            .all(|c| c.kind == CardKind::NativeLanguage && c.validate().is_ok()));
    }

    #[test]
    fn lookup_by_id() {
        let content = StaticContent::new(vec![CardRecord::new(
            "n1",
            CardKind::NativeLanguage,
            "sí",
            "yes",
        )]);
        assert!(content.get(&CardId::new("n1")).is_some());
        assert!(content.get(&CardId::new("n2")).is_none());
    }
}
