//! Reconciliation of card sources into one ordered view
//!
//! A pure function over borrowed snapshots of every source. Private lists are
//! presented first, then the bundled deck, then the public collection; the
//! first occurrence of an id wins, and public records shadowed by a private
//! record (directly or through a known id alias) are dropped.

use std::collections::HashSet;

use flashdeck_core::{CardRecord, IdAliases, Visibility};

/// Borrowed snapshot of every card source.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    /// Private lists in presentation order
    pub private: &'a [&'a [CardRecord]],
    /// Bundled read-only deck
    pub static_content: &'a [CardRecord],
    /// Shared public collection
    pub public: &'a [CardRecord],
}

impl<'a> Sources<'a> {
    fn private_cards(self) -> impl Iterator<Item = &'a CardRecord> + 'a {
        self.private.iter().flat_map(|list| list.iter())
    }
}

/// Merge `sources` into a single list under `visibility`.
///
/// - [`Visibility::All`]: private, then static, then unshadowed public
/// - [`Visibility::PrivateOnly`]: private cards only
/// - [`Visibility::PublishedOnly`]: the public collection in its own order;
///   a record repeated within it is kept once
///
/// The output never contains two records with the same id.
pub fn reconcile(
    sources: &Sources<'_>,
    visibility: Visibility,
    aliases: &IdAliases,
) -> Vec<CardRecord> {
    match visibility {
        Visibility::PrivateOnly => first_occurrences(sources.private_cards()),
        Visibility::PublishedOnly => first_occurrences(sources.public.iter()),
        Visibility::All => {
            let private_ids: HashSet<&str> =
                sources.private_cards().map(|card| card.id.as_str()).collect();
            let shadowed = |card: &CardRecord| {
                private_ids.contains(card.id.as_str())
                    || aliases
                        .alternates(&card.id)
                        .any(|alt| private_ids.contains(alt.as_str()))
            };
            first_occurrences(
                sources
                    .private_cards()
                    .chain(sources.static_content.iter())
                    .chain(sources.public.iter().filter(|card| !shadowed(card))),
            )
        }
    }
}

fn first_occurrences<'a>(cards: impl Iterator<Item = &'a CardRecord>) -> Vec<CardRecord> {
    let mut seen = HashSet::new();
    cards
        .filter(|card| seen.insert(card.id.as_str()))
        .cloned()
        .collect()
}
