//! Card records, kinds and the private/public origin split

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{DeckError, Result};
use crate::ids::{CardId, IdAliases};

// =============================================================================
// Kinds
// =============================================================================

/// Content kind of a card. Determines default permissions and which private
/// list the card lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    /// Vocabulary imported from the sibling lexicon module
    ImportedLexicon,
    /// Bundled native-language content
    NativeLanguage,
    /// Scripture passage, abridged form
    ScriptureAbridged,
    /// Scripture passage, full text
    ScriptureFull,
    /// Authored by the user
    UserDefined,
}

impl CardKind {
    /// Prefix used when generating ids for this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::ImportedLexicon => "lexicon",
            Self::NativeLanguage => "native",
            Self::ScriptureAbridged => "scripture",
            Self::ScriptureFull => "scripture-full",
            Self::UserDefined => "custom",
        }
    }

    /// Default permissions granted to the user for cards of this kind.
    pub fn permissions(self) -> CardPermissions {
        match self {
            Self::ImportedLexicon | Self::UserDefined => CardPermissions {
                editable: true,
                deletable: true,
            },
            Self::NativeLanguage | Self::ScriptureAbridged | Self::ScriptureFull => {
                CardPermissions {
                    editable: false,
                    deletable: false,
                }
            }
        }
    }

    /// Private list holding cards of this kind. Bundled content has none.
    pub fn private_list(self) -> Option<PrivateList> {
        match self {
            Self::ImportedLexicon => Some(PrivateList::Lexicon),
            Self::ScriptureAbridged | Self::ScriptureFull => Some(PrivateList::Scripture),
            Self::UserDefined => Some(PrivateList::Custom),
            Self::NativeLanguage => None,
        }
    }
}

impl Default for CardKind {
    fn default() -> Self {
        Self::UserDefined
    }
}

/// What the user may do with a card by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardPermissions {
    /// Faces and category may be edited
    pub editable: bool,
    /// Card may be deleted
    pub deletable: bool,
}

/// The three private lists wired into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrivateList {
    /// Imported-lexicon cards (bridge while anonymous, remote while signed in)
    Lexicon,
    /// Bible-derived cards, abridged and full
    Scripture,
    /// User-defined cards
    Custom,
}

impl PrivateList {
    /// All private lists in presentation order.
    pub const ALL: [PrivateList; 3] = [Self::Custom, Self::Scripture, Self::Lexicon];

    /// Whether snapshots of this list are mirrored into device-local storage.
    pub fn is_locally_cached(self) -> bool {
        !matches!(self, Self::Lexicon)
    }

    /// Short name used in storage keys and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Lexicon => "lexicon",
            Self::Scripture => "scripture",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PrivateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Origin and visibility
// =============================================================================

/// Collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// The per-user collection (or device-local storage while anonymous)
    #[default]
    Private,
    /// The shared public collection
    Public,
}

/// Visibility filter applied by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    /// Private, bundled and public cards
    #[default]
    All,
    /// Only the user's private cards
    PrivateOnly,
    /// Everything in the public collection
    PublishedOnly,
}

// =============================================================================
// Metadata
// =============================================================================

/// Structured scripture citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptureRef {
    /// Book name
    pub book: String,
    /// Chapter number
    pub chapter: u16,
    /// First verse
    pub verse_start: u16,
    /// Last verse for ranges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<u16>,
    /// Translation abbreviation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl fmt::Display for ScriptureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse_start)?;
        if let Some(end) = self.verse_end.filter(|end| *end != self.verse_start) {
            write!(f, "-{end}")?;
        }
        Ok(())
    }
}

/// Kind-specific extension fields. Opaque to the reconciler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    /// Pronunciation aid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    /// Scripture citation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<ScriptureRef>,
    /// Fields this version does not know about, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Records
// =============================================================================

/// Content of a card without identity, as supplied by the user or copied
/// into the public collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    /// Display grouping; empty means uncategorized
    #[serde(default)]
    pub category: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Extension fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CardMetadata>,
}

impl CardDraft {
    /// Draft with both faces and no category.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            category: String::new(),
            front: front.into(),
            back: back.into(),
            metadata: None,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: CardMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Both faces are required and must not be blank.
    pub fn validate(&self) -> Result<()> {
        validate_faces(&self.front, &self.back)
    }
}

/// Partial update of a card's editable fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    /// New category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New front face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    /// New back face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    /// Replacement metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CardMetadata>,
}

impl CardUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.front.is_none()
            && self.back.is_none()
            && self.metadata.is_none()
    }

    /// Faces that are being replaced must not become blank.
    pub fn validate(&self) -> Result<()> {
        for (face, value) in [("front", &self.front), ("back", &self.back)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(DeckError::invalid(format!("card {face} cannot be blank")));
            }
        }
        Ok(())
    }
}

/// The unit of learning content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Identity, the deduplication key
    pub id: CardId,
    /// Content kind
    pub kind: CardKind,
    /// Display grouping; empty means uncategorized
    #[serde(default)]
    pub category: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Extension fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CardMetadata>,
    /// Collection the record lives in
    #[serde(default)]
    pub origin: Origin,
}

impl CardRecord {
    /// Build a private record from a draft.
    pub fn from_draft(id: CardId, kind: CardKind, draft: CardDraft) -> Self {
        Self {
            id,
            kind,
            category: draft.category,
            front: draft.front,
            back: draft.back,
            metadata: draft.metadata,
            origin: Origin::Private,
        }
    }

    /// Shorthand for a private record without category or metadata.
    pub fn new(
        id: impl Into<CardId>,
        kind: CardKind,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        Self::from_draft(id.into(), kind, CardDraft::new(front, back))
    }

    /// Same record with a different origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Same record with a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Content of the record without its identity.
    pub fn draft(&self) -> CardDraft {
        CardDraft {
            category: self.category.clone(),
            front: self.front.clone(),
            back: self.back.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Default permissions for this record's kind.
    pub fn permissions(&self) -> CardPermissions {
        self.kind.permissions()
    }

    /// Private list this record belongs in.
    pub fn private_list(&self) -> Option<PrivateList> {
        self.kind.private_list()
    }

    /// Both faces are required and must not be blank.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(DeckError::invalid("card id cannot be blank"));
        }
        validate_faces(&self.front, &self.back)
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &CardUpdate) {
        if let Some(category) = &update.category {
            self.category.clone_from(category);
        }
        if let Some(front) = &update.front {
            self.front.clone_from(front);
        }
        if let Some(back) = &update.back {
            self.back.clone_from(back);
        }
        if let Some(metadata) = &update.metadata {
            self.metadata = Some(metadata.clone());
        }
    }

    /// Whether this is imported-lexicon content still filed under another
    /// kind, i.e. content the one-time reclassification has not reached.
    pub fn is_misclassified_lexicon(&self, aliases: &IdAliases) -> bool {
        self.kind != CardKind::ImportedLexicon
            && aliases.belongs_to(&self.id, CardKind::ImportedLexicon)
    }
}

fn validate_faces(front: &str, back: &str) -> Result<()> {
    if front.trim().is_empty() {
        return Err(DeckError::invalid("card front cannot be blank"));
    }
    if back.trim().is_empty() {
        return Err(DeckError::invalid("card back cannot be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_camel_case() {
        let json = serde_json::to_string(&CardKind::ScriptureAbridged).unwrap();
        assert_eq!(json, "\"scriptureAbridged\"");
        let kind: CardKind = serde_json::from_str("\"importedLexicon\"").unwrap();
        assert_eq!(kind, CardKind::ImportedLexicon);
    }

    #[test]
    fn permissions_follow_kind() {
        assert!(CardKind::UserDefined.permissions().editable);
        assert!(CardKind::ImportedLexicon.permissions().deletable);
        assert!(!CardKind::ScriptureFull.permissions().editable);
        assert!(!CardKind::NativeLanguage.permissions().deletable);
    }

    #[test]
    fn origin_defaults_to_private_when_missing() {
        let json = r#"{"id":"c1","kind":"userDefined","front":"hola","back":"hello"}"#;
        let card: CardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(card.origin, Origin::Private);
        assert_eq!(card.category, "");
    }

    #[test]
    fn unknown_metadata_fields_survive_round_trip() {
        let json = r#"{"pronunciation":"OH-lah","strokeCount":4}"#;
        let meta: CardMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.pronunciation.as_deref(), Some("OH-lah"));
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["strokeCount"], 4);
    }

    #[test]
    fn blank_faces_are_rejected() {
        assert!(CardDraft::new("", "x").validate().is_err());
        assert!(CardDraft::new("x", "  ").validate().is_err());
        assert!(CardDraft::new("x", "y").validate().is_ok());
        let update = CardUpdate {
            back: Some(String::new()),
            ..CardUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut card = CardRecord::new("c1", CardKind::UserDefined, "hola", "hello")
            .with_category("greetings");
        card.apply(&CardUpdate {
            back: Some("hi".into()),
            ..CardUpdate::default()
        });
        assert_eq!(card.front, "hola");
        assert_eq!(card.back, "hi");
        assert_eq!(card.category, "greetings");
    }

    #[test]
    fn scripture_ref_display() {
        let single = ScriptureRef {
            book: "John".into(),
            chapter: 3,
            verse_start: 16,
            verse_end: None,
            translation: None,
        };
        assert_eq!(single.to_string(), "John 3:16");
        let range = ScriptureRef {
            verse_end: Some(17),
            ..single
        };
        assert_eq!(range.to_string(), "John 3:16-17");
    }

    #[test]
    fn misclassified_lexicon_detection() {
        let aliases = IdAliases::default();
        let stale = CardRecord::new("vocab-9", CardKind::UserDefined, "gato", "cat");
        let fixed = CardRecord::new("vocab-9", CardKind::ImportedLexicon, "gato", "cat");
        let custom = CardRecord::new("custom-1", CardKind::UserDefined, "perro", "dog");
        assert!(stale.is_misclassified_lexicon(&aliases));
        assert!(!fixed.is_misclassified_lexicon(&aliases));
        assert!(!custom.is_misclassified_lexicon(&aliases));
    }
}
