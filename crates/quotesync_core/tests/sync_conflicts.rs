mod common;

use common::{harness, harness_with_quotes, GatedRemote, ScriptedRemote};
use quotesync_core::storage::{KEY_CONFLICTS, KEY_QUOTES};
use quotesync_core::{
    ConflictRecord, KeyValueStore, NoticeLevel, Quote, Resolution, SyncOutcome,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn sync_appends_unknown_remote_quotes() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(vec![
        Quote::with_id(1, "sunt aut facere", "quia et suscipit"),
        Quote::with_id(2, "qui est esse", "est rerum tempore"),
    ]);
    let h = harness(remote);

    let report = h.store.sync().await;
    assert_eq!(report.applied, 2);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.outcome, SyncOutcome::Synced);
    assert_eq!(report.finished_at_ms, 1_700_000_000_000);
    assert_eq!(h.store.len().await, 5);

    let again = h.store.sync().await;
    assert_eq!(again.applied, 0);
    assert_eq!(h.store.len().await, 5);
}

#[tokio::test]
async fn sync_conflict_applies_server_then_keep_local_restores() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(vec![Quote::with_id(5, "Z", "Y")]);
    let h = harness_with_quotes(remote, &[Quote::with_id(5, "X", "Y")]);

    let report = h.store.sync().await;
    assert_eq!(report.outcome, SyncOutcome::Conflicted);
    assert_eq!(
        report.conflicts,
        vec![ConflictRecord::new(
            Quote::with_id(5, "X", "Y"),
            Quote::with_id(5, "Z", "Y")
        )]
    );
    assert_eq!(h.store.quotes().await, vec![Quote::with_id(5, "Z", "Y")]);
    assert_eq!(h.store.pending_conflicts().await, report.conflicts);
    assert!(h.session.get(KEY_CONFLICTS).unwrap().is_some());

    let resolution = h.store.resolve_conflicts(true).await;
    assert_eq!(resolution, Resolution::KeptLocal(1));
    assert_eq!(h.store.quotes().await, vec![Quote::with_id(5, "X", "Y")]);
    assert!(h.store.pending_conflicts().await.is_empty());
    assert!(h.session.get(KEY_CONFLICTS).unwrap().is_none());

    let persisted: Vec<Quote> =
        serde_json::from_str(&h.durable.get(KEY_QUOTES).unwrap().unwrap()).unwrap();
    assert_eq!(persisted, vec![Quote::with_id(5, "X", "Y")]);
}

#[tokio::test]
async fn keep_server_leaves_applied_versions() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(vec![Quote::with_id(5, "Z", "Y")]);
    let h = harness_with_quotes(remote, &[Quote::with_id(5, "X", "Y")]);
    h.store.sync().await;

    let resolution = h.store.resolve_conflicts(false).await;
    assert_eq!(resolution, Resolution::KeptServer(1));
    assert_eq!(h.store.quotes().await, vec![Quote::with_id(5, "Z", "Y")]);
    assert!(h.store.pending_conflicts().await.is_empty());
}

#[tokio::test]
async fn resolve_without_conflicts_is_a_distinct_noop() {
    let remote = Arc::new(ScriptedRemote::new());
    let h = harness(remote);
    let before = h.store.quotes().await;

    assert_eq!(
        h.store.resolve_conflicts(true).await,
        Resolution::NothingToResolve
    );
    assert_eq!(h.store.quotes().await, before);
    assert!(h.durable.get(KEY_QUOTES).unwrap().is_none());
}

#[tokio::test]
async fn clean_sync_keeps_outstanding_conflicts() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(vec![Quote::with_id(5, "Z", "Y")]);
    let h = harness_with_quotes(remote.clone(), &[Quote::with_id(5, "X", "Y")]);
    h.store.sync().await;

    remote.set_batch(vec![Quote::with_id(5, "Z", "Y")]);
    let report = h.store.sync().await;
    assert!(report.conflicts.is_empty());
    assert_eq!(h.store.pending_conflicts().await.len(), 1);
}

#[tokio::test]
async fn failed_fetch_leaves_store_byte_for_byte_unchanged() {
    let remote = Arc::new(ScriptedRemote::new());
    let h = harness_with_quotes(remote.clone(), &[Quote::with_id(5, "X", "Y")]);
    let before_quotes = h.store.quotes().await;
    let before_bytes = h.durable.get(KEY_QUOTES).unwrap();
    let mut notices = h.store.subscribe();

    remote.fail_fetch();
    let report = h.store.sync().await;

    assert_eq!(report.applied, 0);
    assert!(report.conflicts.is_empty());
    assert!(report.is_remote_unavailable());
    assert_eq!(h.store.quotes().await, before_quotes);
    assert_eq!(h.durable.get(KEY_QUOTES).unwrap(), before_bytes);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Failed to fetch quotes from server.");
}

#[tokio::test]
async fn sync_processes_at_most_ten_remote_quotes() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(
        (1..=15)
            .map(|id| Quote::with_id(id, format!("title {id}"), "body"))
            .collect(),
    );
    let h = harness_with_quotes(remote, &[]);

    let report = h.store.sync().await;
    assert_eq!(report.applied, 10);
    assert_eq!(h.store.len().await, 10);
}

#[tokio::test]
async fn overlapping_syncs_never_fetch_concurrently() {
    let remote = Arc::new(GatedRemote::new());
    remote.set_batch(vec![
        Quote::with_id(1, "a", "x"),
        Quote::with_id(2, "b", "y"),
    ]);
    let h = harness_with_quotes(remote.clone(), &[]);
    let store = Arc::new(h.store);

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.sync().await }
    });
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.sync().await }
    });
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    assert_eq!(remote.max_concurrent_fetches(), 1);
    assert_eq!(first.applied + second.applied, 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn add_during_sync_leaves_quote_unsynced_when_server_claims_its_id() {
    let remote = Arc::new(GatedRemote::new());
    remote.hold_register(true);
    let h = harness(remote.clone());
    let store = Arc::new(h.store);

    let add = tokio::spawn({
        let store = store.clone();
        async move { store.add_quote("mine", "Mine").await }
    });
    remote.register_entered.notified().await;

    remote.set_batch(vec![
        Quote::with_id(101, "server", "s"),
        Quote::with_id(102, "server2", "s"),
    ]);
    let report = store.sync().await;
    assert_eq!(report.applied, 2);

    remote.register_release.notify_one();
    let added = add.await.unwrap().unwrap();
    assert_eq!(added.id, None);

    let quotes = store.quotes().await;
    assert_eq!(quotes.len(), 6);
    assert_eq!(quotes[3], Quote::new("mine", "Mine"));
    assert_eq!(quotes[4], Quote::with_id(101, "server", "s"));
    assert_eq!(quotes[5], Quote::with_id(102, "server2", "s"));

    let ids: Vec<_> = quotes.iter().filter_map(|quote| quote.id).collect();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len());
}

#[tokio::test]
async fn import_during_sync_assigns_id_to_the_imported_quote() {
    let remote = Arc::new(GatedRemote::new());
    remote.hold_register(true);
    let h = harness(remote.clone());
    let store = Arc::new(h.store);

    let import = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .import_quotes(json!([{"text": "mine", "category": "Mine"}]))
                .await
        }
    });
    remote.register_entered.notified().await;

    remote.set_batch(vec![Quote::with_id(1, "a", "x"), Quote::with_id(2, "b", "y")]);
    assert_eq!(store.sync().await.applied, 2);

    remote.register_release.notify_one();
    assert_eq!(import.await.unwrap().unwrap(), 1);

    let quotes = store.quotes().await;
    assert_eq!(quotes[3], Quote::with_id(101, "mine", "Mine"));
    assert_eq!(quotes[4], Quote::with_id(1, "a", "x"));
    assert_eq!(quotes[5], Quote::with_id(2, "b", "y"));

    let persisted: Vec<Quote> =
        serde_json::from_str(&h.durable.get(KEY_QUOTES).unwrap().unwrap()).unwrap();
    assert_eq!(persisted, quotes);
}

#[tokio::test]
async fn conflicts_survive_store_reopen_within_session() {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_batch(vec![Quote::with_id(5, "Z", "Y")]);
    let h = harness_with_quotes(remote.clone(), &[Quote::with_id(5, "X", "Y")]);
    h.store.sync().await;

    let reopened = quotesync_core::QuoteStore::open(
        common::capabilities(h.durable.clone(), h.session.clone(), remote, h.clock.clone()),
        10,
    )
    .unwrap();
    assert_eq!(reopened.pending_conflicts().await.len(), 1);
    assert_eq!(
        reopened.resolve_conflicts(true).await,
        Resolution::KeptLocal(1)
    );
    assert_eq!(reopened.quotes().await, vec![Quote::with_id(5, "X", "Y")]);
}
