//! Card fixtures

use flashdeck_core::{CardKind, CardRecord, Origin, StaticContent};

/// Private user-defined card.
pub fn custom_card(id: &str) -> CardRecord {
    CardRecord::new(id, CardKind::UserDefined, format!("{id} front"), format!("{id} back"))
}

/// Private abridged scripture card.
pub fn scripture_card(id: &str) -> CardRecord {
    CardRecord::new(
        id,
        CardKind::ScriptureAbridged,
        format!("{id} reference"),
        format!("{id} passage"),
    )
}

/// Private imported-lexicon card.
pub fn lexicon_card(id: &str) -> CardRecord {
    CardRecord::new(id, CardKind::ImportedLexicon, format!("{id} word"), format!("{id} gloss"))
}

/// Public user-defined card.
pub fn public_card(id: &str) -> CardRecord {
    custom_card(id).with_origin(Origin::Public)
}

/// Small bundled deck of native-language cards.
pub fn small_deck(ids: &[&str]) -> StaticContent {
    StaticContent::new(
        ids.iter()
            .map(|id| CardRecord::new(*id, CardKind::NativeLanguage, "hola", "hello"))
            .collect(),
    )
}
