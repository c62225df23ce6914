//! Optimistic mutations in both session modes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use flashdeck_core::{
    CardDraft, CardId, CardKind, CardRecord, CardUpdate, DeckError, Origin, PrivateList, Visibility,
};
use flashdeck_testkit::{
    custom_card, init_tracing, lexicon_card, public_card, scripture_card, wait_for_cards,
    RemoteCall, TestHarness,
};

fn ids(cards: &[CardRecord]) -> Vec<String> {
    cards.iter().map(|c| c.id.to_string()).collect()
}

fn has(cards: &[CardRecord], id: &str) -> bool {
    cards.iter().any(|c| c.id.as_str() == id)
}

async fn seed_local(harness: &TestHarness, list: PrivateList, cards: &[CardRecord]) {
    harness.local().set_cards(list, cards).await.unwrap();
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn toggle_keeps_change_when_remote_write_fails() {
    init_tracing();
    let harness = TestHarness::new();
    harness.sign_in();
    let engine = harness.open().await;
    harness.remote.reset_calls();
    harness.remote.fail_writes(true);

    let c1 = CardId::new("c1");
    assert!(engine.toggle_mastered(&c1).await);
    engine.settle().await;

    assert!(engine.progress().is_mastered(&c1));
    assert!(harness.local().progress().await.is_mastered(&c1));
    assert_eq!(harness.remote.call_count(RemoteCall::UpdateProgress), 1);
    assert!(harness.remote.stored_progress().is_none());
}

#[tokio::test]
async fn toggle_twice_unmasters() {
    let harness = TestHarness::new();
    let engine = harness.open().await;
    let c1 = CardId::new("c1");

    assert!(engine.toggle_mastered(&c1).await);
    assert!(!engine.toggle_mastered(&c1).await);
    assert!(!harness.local().progress().await.is_mastered(&c1));
    assert_eq!(harness.remote.private_calls(), 0);
}

#[tokio::test]
async fn mastered_count_only_counts_visible_cards() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("c1")]).await;
    let engine = harness.open().await;

    engine.toggle_mastered(&CardId::new("c1")).await;
    engine.toggle_mastered(&CardId::new("native-2")).await;
    engine.toggle_mastered(&CardId::new("gone")).await;
    assert_eq!(engine.mastered_count(), 2);
}

#[tokio::test]
async fn reset_clears_memory_local_and_remote() {
    let harness = TestHarness::new();
    harness.sign_in();
    let engine = harness.open().await;
    engine.toggle_mastered(&CardId::new("c1")).await;
    engine.toggle_mastered(&CardId::new("c2")).await;

    engine.reset_progress().await;
    engine.settle().await;

    assert!(engine.progress().is_empty());
    assert!(harness.local().progress().await.is_empty());
    assert!(harness.remote.stored_progress().unwrap().is_empty());
}

// =============================================================================
// Visibility
// =============================================================================

#[tokio::test]
async fn visibility_filters_the_view() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("a")]).await;
    harness
        .remote
        .seed_public(vec![public_card("a"), public_card("b")]);
    let engine = harness.open().await;
    wait_for_cards(&engine, |cards| has(cards, "b")).await;

    assert_eq!(ids(&engine.cards()), ["a", "native-1", "native-2", "b"]);
    assert_eq!(engine.cards()[0].origin, Origin::Private);

    engine.set_visibility(Visibility::PrivateOnly);
    assert_eq!(ids(&engine.cards()), ["a"]);

    engine.set_visibility(Visibility::PublishedOnly);
    let published = engine.cards();
    assert_eq!(ids(&published), ["a", "b"]);
    assert!(published.iter().all(|c| c.origin == Origin::Public));
}

// =============================================================================
// Adding
// =============================================================================

#[tokio::test]
async fn add_single_rejects_blank_faces_and_bundled_kinds() {
    let harness = TestHarness::new();
    let engine = harness.open().await;

    let err = engine
        .add_single(CardDraft::new("   ", "back"), None)
        .await
        .unwrap_err();
    assert_matches!(err, DeckError::Invalid { .. });

    let err = engine
        .add_single(CardDraft::new("hola", "hello"), Some(CardKind::NativeLanguage))
        .await
        .unwrap_err();
    assert_matches!(err, DeckError::Invalid { .. });

    assert_eq!(ids(&engine.cards()), ["native-1", "native-2"]);
}

#[tokio::test]
async fn add_single_generates_distinct_ids_in_the_same_millisecond() {
    let harness = TestHarness::new();
    let engine = harness.open().await;

    let first = engine
        .add_single(CardDraft::new("uno", "one"), None)
        .await
        .unwrap();
    let second = engine
        .add_single(CardDraft::new("dos", "two"), None)
        .await
        .unwrap();

    assert!(first.id.has_prefix("custom-"));
    assert_ne!(first.id, second.id);
    assert_eq!(first.origin, Origin::Private);

    let stored = harness.local().cards(PrivateList::Custom).await;
    assert_eq!(ids(&stored), [first.id.to_string(), second.id.to_string()]);
}

#[tokio::test]
async fn add_single_scripture_lands_in_scripture_list() {
    let harness = TestHarness::new();
    let engine = harness.open().await;

    let card = engine
        .add_single(
            CardDraft::new("John 3:16", "For God so loved"),
            Some(CardKind::ScriptureFull),
        )
        .await
        .unwrap();

    assert!(card.id.has_prefix("scripture-full-"));
    assert!(has(&harness.local().cards(PrivateList::Scripture).await, card.id.as_str()));
}

#[tokio::test]
async fn add_cards_skips_duplicates_and_bundled_kinds() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("c0")]).await;
    let engine = harness.open().await;

    let native = CardRecord::new("native-9", CardKind::NativeLanguage, "f", "b");
    let blank = CardRecord::new("c5", CardKind::UserDefined, "", "b");
    let added = engine
        .add_cards(vec![
            custom_card("c0"),
            custom_card("c1"),
            custom_card("c1"),
            native,
            blank,
            scripture_card("s1"),
            lexicon_card("lexicon-1"),
        ])
        .await;
    engine.settle().await;

    let mut added = ids(&added);
    added.sort();
    assert_eq!(added, ["c1", "lexicon-1", "s1"]);

    let local = harness.local();
    assert_eq!(ids(&local.cards(PrivateList::Custom).await), ["c0", "c1"]);
    assert_eq!(ids(&local.cards(PrivateList::Scripture).await), ["s1"]);
    assert!(has(&harness.bridge.cards(), "lexicon-1"));
    assert_eq!(harness.remote.private_calls(), 0);
}

#[tokio::test]
async fn signed_in_adds_use_single_and_batch_writes() {
    let harness = TestHarness::new();
    harness.sign_in();
    let engine = harness.open().await;
    harness.remote.reset_calls();

    engine.add_cards(vec![custom_card("c1")]).await;
    engine
        .add_cards(vec![custom_card("c2"), custom_card("c3")])
        .await;
    engine.settle().await;

    assert_eq!(harness.remote.call_count(RemoteCall::Add), 1);
    assert_eq!(harness.remote.call_count(RemoteCall::AddBatch), 1);
    assert_eq!(ids(&harness.remote.private_cards()), ["c1", "c2", "c3"]);
}

// =============================================================================
// Updating and deleting
// =============================================================================

#[tokio::test]
async fn update_fields_persists_locally() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("c1")]).await;
    let engine = harness.open().await;
    let c1 = CardId::new("c1");

    let update = CardUpdate {
        front: Some("nuevo".into()),
        ..CardUpdate::default()
    };
    assert!(engine.update_fields(&c1, update).await);
    assert_eq!(engine.cards()[0].front, "nuevo");
    assert_eq!(harness.local().cards(PrivateList::Custom).await[0].front, "nuevo");

    let blank = CardUpdate {
        back: Some(" ".into()),
        ..CardUpdate::default()
    };
    assert!(!engine.update_fields(&c1, blank).await);
    assert!(!engine.update_fields(&c1, CardUpdate::default()).await);

    let unknown = CardUpdate {
        front: Some("x".into()),
        ..CardUpdate::default()
    };
    assert!(!engine.update_fields(&CardId::new("native-1"), unknown).await);
}

#[tokio::test]
async fn signed_in_update_reaches_remote() {
    let harness = TestHarness::new();
    harness.remote.seed_private(vec![custom_card("c1")]);
    harness.sign_in();
    let engine = harness.open().await;
    wait_for_cards(&engine, |cards| has(cards, "c1")).await;

    let update = CardUpdate {
        category: Some("greetings".into()),
        ..CardUpdate::default()
    };
    assert!(engine.update_fields(&CardId::new("c1"), update).await);
    engine.settle().await;

    assert_eq!(harness.remote.private_cards()[0].category, "greetings");
}

#[tokio::test]
async fn delete_routes_by_origin() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("c1")]).await;
    harness.bridge.replace(vec![lexicon_card("b1")]);
    harness.remote.seed_public(vec![public_card("p1")]);
    let engine = harness.open().await;
    wait_for_cards(&engine, |cards| has(cards, "p1")).await;

    assert_eq!(engine.delete_by_id(&CardId::new("c1")).await, Some(Origin::Private));
    assert_eq!(engine.delete_by_id(&CardId::new("b1")).await, Some(Origin::Private));
    assert_eq!(engine.delete_by_id(&CardId::new("p1")).await, Some(Origin::Public));
    assert_eq!(engine.delete_by_id(&CardId::new("missing")).await, None);
    engine.settle().await;

    assert_eq!(ids(&engine.cards()), ["native-1", "native-2"]);
    assert!(harness.local().cards(PrivateList::Custom).await.is_empty());
    assert!(harness.local().public_cards().await.is_empty());
    assert!(harness.bridge.cards().is_empty());
    assert!(harness.remote.public_cards().is_empty());
    assert_eq!(harness.remote.call_count(RemoteCall::DeletePublic), 1);
    assert_eq!(harness.remote.call_count(RemoteCall::Delete), 0);
}

// =============================================================================
// Publishing
// =============================================================================

#[tokio::test]
async fn publish_copies_then_deletes_private() {
    init_tracing();
    let harness = TestHarness::new();
    harness.remote.seed_private(vec![custom_card("c1")]);
    harness.sign_in();
    let engine = harness.open().await;
    wait_for_cards(&engine, |cards| has(cards, "c1")).await;

    let card = engine
        .cards()
        .into_iter()
        .find(|c| c.id.as_str() == "c1")
        .unwrap();
    assert!(engine.publish(&card).await);
    engine.settle().await;

    wait_for_cards(&engine, |cards| has(cards, "public-1") && !has(cards, "c1")).await;
    assert!(!has(&harness.remote.private_cards(), "c1"));
    let public = harness.remote.public_cards();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].front, card.front);
    assert!(has(&harness.local().public_cards().await, "public-1"));
}

#[tokio::test]
async fn failed_publish_keeps_private_copy() {
    let harness = TestHarness::new();
    seed_local(&harness, PrivateList::Custom, &[custom_card("c1")]).await;
    let engine = harness.open().await;
    harness.remote.fail_writes(true);

    let card = engine.cards()[0].clone();
    assert!(!engine.publish(&card).await);

    assert!(has(&engine.cards(), "c1"));
    assert!(has(&harness.local().cards(PrivateList::Custom).await, "c1"));
    assert!(harness.remote.public_cards().is_empty());
}

#[tokio::test]
async fn publishing_a_public_card_is_refused() {
    let harness = TestHarness::new();
    let engine = harness.open().await;

    assert!(!engine.publish(&public_card("p1")).await);
    assert_eq!(harness.remote.call_count(RemoteCall::Publish), 0);
}
