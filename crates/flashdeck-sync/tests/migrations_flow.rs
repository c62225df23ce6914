//! One-time migrations as the engine runs them.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use flashdeck_core::{CardId, CardKind, CardRecord, PrivateList, ProgressRecord};
use flashdeck_sync::{EngineConfig, Marker};
use flashdeck_testkit::{custom_card, wait_for_cards, RemoteCall, TestHarness};

fn seed_legacy(harness: &TestHarness) {
    harness.storage.put_json(
        "vocabulary-trainer/progress",
        &serde_json::json!({ "masteredIds": [12, "40"] }),
    );
    harness
        .storage
        .put_json("verse-memorizer/progress", &serde_json::json!(["psalm-23"]));
}

// =============================================================================
// Legacy progress merge
// =============================================================================

#[tokio::test]
async fn legacy_progress_is_merged_at_open() {
    let harness = TestHarness::new();
    harness
        .local()
        .set_progress(&ProgressRecord::with_mastered(["custom-1"]))
        .await
        .unwrap();
    seed_legacy(&harness);

    let engine = harness.open().await;

    let progress = engine.progress();
    for id in ["custom-1", "lexicon-12", "lexicon-40", "scripture-psalm-23"] {
        assert!(progress.is_mastered(&CardId::new(id)), "{id} missing");
    }
    assert!(!harness.storage.contains("vocabulary-trainer/progress"));
    assert!(!harness.storage.contains("verse-memorizer/progress"));
    assert!(harness.local().has_marker(Marker::LegacyProgressMerged).await);
}

#[tokio::test]
async fn legacy_merge_does_not_repeat_on_reopen() {
    let harness = TestHarness::new();
    seed_legacy(&harness);
    let first = harness.open().await;
    let merged = first.progress();
    first.close().await;

    harness.storage.put_json(
        "vocabulary-trainer/progress",
        &serde_json::json!({ "mastered": [99] }),
    );
    let second = harness.open().await;

    assert_eq!(second.progress().mastered_ids, merged.mastered_ids);
    assert!(!second.progress().is_mastered(&CardId::new("lexicon-99")));
}

#[tokio::test]
async fn legacy_merge_can_be_disabled() {
    let harness =
        TestHarness::new().with_config(EngineConfig::default().with_legacy_progress_merge(false));
    seed_legacy(&harness);

    let engine = harness.open().await;

    assert!(engine.progress().is_empty());
    assert!(harness.storage.contains("vocabulary-trainer/progress"));
    assert!(!harness.local().has_marker(Marker::LegacyProgressMerged).await);
}

#[tokio::test]
async fn merged_legacy_progress_is_uploaded_on_sign_in() {
    let harness = TestHarness::new();
    seed_legacy(&harness);
    let engine = harness.open().await;

    harness.sign_in();
    engine.refresh_auth().await;
    engine.settle().await;

    let stored = harness.remote.stored_progress().unwrap();
    assert!(stored.is_mastered(&CardId::new("lexicon-12")));
    assert!(stored.is_mastered(&CardId::new("scripture-psalm-23")));
    assert_eq!(harness.remote.call_count(RemoteCall::UpdateProgress), 1);
}

// =============================================================================
// Lexicon reclassification
// =============================================================================

#[tokio::test]
async fn misfiled_lexicon_cards_are_reclassified_once() {
    let harness = TestHarness::new();
    harness.remote.seed_private(vec![
        CardRecord::new("vocab-1", CardKind::UserDefined, "perro", "dog"),
        custom_card("c1"),
    ]);
    harness.sign_in();
    let engine = harness.open().await;

    assert_eq!(harness.remote.call_count(RemoteCall::Reclassify), 1);
    assert!(harness.local().has_marker(Marker::LexiconReclassified).await);
    wait_for_cards(&engine, |cards| {
        cards
            .iter()
            .any(|c| c.id.as_str() == "vocab-1" && c.kind == CardKind::ImportedLexicon)
    })
    .await;
    assert!(harness
        .local()
        .cards(PrivateList::Custom)
        .await
        .iter()
        .all(|c| c.id.as_str() != "vocab-1"));

    // A lost marker reruns the check but finds nothing left to fix.
    harness
        .local()
        .clear_marker(Marker::LexiconReclassified)
        .await
        .unwrap();
    harness.sign_out();
    engine.refresh_auth().await;
    harness.sign_in();
    engine.refresh_auth().await;
    engine.settle().await;

    assert_eq!(harness.remote.call_count(RemoteCall::Reclassify), 1);
    assert!(harness.local().has_marker(Marker::LexiconReclassified).await);
}

#[tokio::test]
async fn converged_collection_skips_the_remote_operation() {
    let harness = TestHarness::new();
    harness.remote.seed_private(vec![
        CardRecord::new("lexicon-1", CardKind::ImportedLexicon, "gato", "cat"),
        custom_card("c1"),
    ]);
    harness.sign_in();
    let _engine = harness.open().await;

    assert_eq!(harness.remote.call_count(RemoteCall::Reclassify), 0);
    assert!(harness.local().has_marker(Marker::LexiconReclassified).await);
}

#[tokio::test]
async fn failed_reclassify_is_retried_on_next_sign_in() {
    let harness = TestHarness::new();
    harness.remote.seed_private(vec![CardRecord::new(
        "vocab-2",
        CardKind::UserDefined,
        "casa",
        "house",
    )]);
    harness.remote.fail_writes(true);
    harness.sign_in();
    let engine = harness.open().await;
    assert!(!harness.local().has_marker(Marker::LexiconReclassified).await);

    harness.remote.fail_writes(false);
    harness.sign_out();
    engine.refresh_auth().await;
    harness.sign_in();
    engine.refresh_auth().await;
    engine.settle().await;

    assert_eq!(harness.remote.call_count(RemoteCall::Reclassify), 2);
    assert!(harness.local().has_marker(Marker::LexiconReclassified).await);
    assert_eq!(harness.remote.private_cards()[0].kind, CardKind::ImportedLexicon);
}
