//! Card identifiers and historical identity aliases
//!
//! Identity, not content, is the deduplication key everywhere in the engine.
//! A [`CardId`] is an opaque string whose prefix names the kind that created
//! it (`custom-1712345678901`, `lexicon-42`, ...). Some kinds were renamed in
//! the past, so the same logical card can appear under two ids; [`IdAliases`]
//! answers "which other ids denote this card".

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::CardKind;

/// Identifier of a [`CardRecord`](crate::CardRecord).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a freshly created card: `{kindPrefix}-{millis}`.
    pub fn generated(kind: CardKind, created_at_ms: i64) -> Self {
        Self(format!("{}-{}", kind.id_prefix(), created_at_ms))
    }

    /// Place a foreign identifier under a namespace prefix.
    ///
    /// Ids that already carry the prefix are returned unchanged so remapping
    /// is idempotent.
    pub fn namespaced(prefix: &str, raw: &str) -> Self {
        let prefix = prefix.trim_end_matches('-');
        let qualified = format!("{prefix}-");
        if raw.starts_with(&qualified) {
            Self(raw.to_string())
        } else {
            Self(format!("{qualified}{raw}"))
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CardId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A prefix rename applied to one content kind's identity scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAlias {
    kind: CardKind,
    historical_prefix: &'static str,
    current_prefix: &'static str,
}

impl IdAlias {
    /// Declare that ids of `kind` once started with `historical_prefix` and
    /// now start with `current_prefix`.
    pub const fn prefix_rename(
        kind: CardKind,
        historical_prefix: &'static str,
        current_prefix: &'static str,
    ) -> Self {
        Self {
            kind,
            historical_prefix,
            current_prefix,
        }
    }

    /// The kind whose identity scheme was renamed.
    pub fn kind(&self) -> CardKind {
        self.kind
    }

    /// The alternate identity of `id` under this rename, in either direction.
    pub fn alternate(&self, id: &CardId) -> Option<CardId> {
        if let Some(rest) = id.as_str().strip_prefix(self.historical_prefix) {
            return Some(CardId(format!("{}{rest}", self.current_prefix)));
        }
        id.as_str()
            .strip_prefix(self.current_prefix)
            .map(|rest| CardId(format!("{}{rest}", self.historical_prefix)))
    }

    /// Whether `id` is written in either the historical or current scheme.
    pub fn matches(&self, id: &CardId) -> bool {
        id.has_prefix(self.historical_prefix) || id.has_prefix(self.current_prefix)
    }
}

/// Registry of per-kind identity aliases.
///
/// The default registry carries the imported-lexicon rename from `vocab-` to
/// `lexicon-`. New renames are registered with [`IdAliases::with_rule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAliases {
    rules: Vec<IdAlias>,
}

/// Historical identity scheme of imported-lexicon cards.
pub const LEXICON_HISTORICAL_PREFIX: &str = "vocab-";

/// Current identity scheme of imported-lexicon cards.
pub const LEXICON_CURRENT_PREFIX: &str = "lexicon-";

impl Default for IdAliases {
    fn default() -> Self {
        Self::none().with_rule(IdAlias::prefix_rename(
            CardKind::ImportedLexicon,
            LEXICON_HISTORICAL_PREFIX,
            LEXICON_CURRENT_PREFIX,
        ))
    }
}

impl IdAliases {
    /// Registry without any alias.
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register another rename.
    #[must_use]
    pub fn with_rule(mut self, rule: IdAlias) -> Self {
        self.rules.push(rule);
        self
    }

    /// Every alternate identity of `id` known to the registry.
    pub fn alternates<'a>(&'a self, id: &'a CardId) -> impl Iterator<Item = CardId> + 'a {
        self.rules.iter().filter_map(move |rule| rule.alternate(id))
    }

    /// Whether `id` is written in an identity scheme registered for `kind`.
    pub fn belongs_to(&self, id: &CardId, kind: CardKind) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.kind == kind && rule.matches(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_kind_prefix() {
        let id = CardId::generated(CardKind::UserDefined, 1_700_000_000_000);
        assert_eq!(id.as_str(), "custom-1700000000000");
    }

    #[test]
    fn namespacing_is_idempotent() {
        let once = CardId::namespaced("lexicon", "42");
        assert_eq!(once.as_str(), "lexicon-42");
        let twice = CardId::namespaced("lexicon-", once.as_str());
        assert_eq!(twice, once);
    }

    #[test]
    fn lexicon_rename_is_bidirectional() {
        let aliases = IdAliases::default();
        let old = CardId::new("vocab-17");
        let new = CardId::new("lexicon-17");
        assert_eq!(aliases.alternates(&old).collect::<Vec<_>>(), vec![new.clone()]);
        assert_eq!(aliases.alternates(&new).collect::<Vec<_>>(), vec![old]);
        assert_eq!(aliases.alternates(&CardId::new("custom-1")).count(), 0);
    }

    #[test]
    fn belongs_to_checks_kind() {
        let aliases = IdAliases::default();
        assert!(aliases.belongs_to(&CardId::new("vocab-3"), CardKind::ImportedLexicon));
        assert!(!aliases.belongs_to(&CardId::new("vocab-3"), CardKind::UserDefined));
        assert!(!IdAliases::none().belongs_to(&CardId::new("vocab-3"), CardKind::ImportedLexicon));
    }
}
