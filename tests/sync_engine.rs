//! End-to-end behavior of the queue and sync engine against a scripted API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    harness, harness_with, harness_with_options, match_record, pit, test_options, FakeRemote,
};
use scout_sync::features::sync::{
    spawn_auto_sync, EngineOptions, EntryStatus, QueueManager, SyncConfig,
};
use scout_sync::storage::Database;
use scout_sync::ScoutError;

#[tokio::test]
async fn offline_enqueues_are_kept_until_a_pass_runs() {
    let h = harness(FakeRemote::new(), SyncConfig::default(), false);

    for team in 1..=5 {
        h.engine.enqueue(&pit(team)).unwrap();
    }
    assert_eq!(h.engine.total_queued_count().unwrap(), 5);
    assert_eq!(h.engine.pending_count().unwrap(), 5);

    let err = h.engine.sync_pending_entries().await.unwrap_err();
    assert!(matches!(err, ScoutError::Offline));
    assert_eq!(h.engine.stats().unwrap().synced, 0);
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn concurrent_pass_is_rejected() {
    let h = harness(
        FakeRemote::new().with_latency(Duration::from_millis(50)),
        SyncConfig::default(),
        true,
    );
    for team in 1..=3 {
        h.engine.enqueue(&pit(team)).unwrap();
    }

    let (first, second) = tokio::join!(
        h.engine.sync_pending_entries(),
        h.engine.sync_pending_entries()
    );

    assert_eq!(first.unwrap().synced, 3);
    assert!(matches!(second.unwrap_err(), ScoutError::SyncInProgress));

    let mut calls = h.remote.calls();
    calls.sort_unstable();
    assert_eq!(calls, vec![1, 2, 3]);
    assert!(!h.engine.is_sync_in_progress());
}

#[tokio::test]
async fn abandoned_syncing_entry_is_pending_after_reload() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db_path = temp_dir.path().join("queue.db");

    let id = {
        let h = harness_with(
            Database::open_at(&db_path).unwrap(),
            FakeRemote::new(),
            SyncConfig::default(),
            false,
        );
        let id = h.engine.enqueue(&pit(254)).unwrap();
        assert!(h.engine.queue().mark_syncing(&id).unwrap());
        id
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let h = harness_with_options(
        Database::open_at(&db_path).unwrap(),
        FakeRemote::new(),
        SyncConfig::default(),
        true,
        EngineOptions {
            claim_lease: Duration::from_millis(20),
            ..test_options()
        },
    );
    let entry = h.engine.queue().get(&id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Pending);

    let result = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(result.synced, 1);
}

#[tokio::test]
async fn second_process_opening_queue_does_not_cause_resubmission() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db_path = temp_dir.path().join("queue.db");

    let h = harness_with(
        Database::open_at(&db_path).unwrap(),
        FakeRemote::new().with_latency(Duration::from_millis(300)),
        SyncConfig::default(),
        true,
    );
    let id = h.engine.enqueue(&pit(254)).unwrap();

    let engine = Arc::clone(&h.engine);
    let pass = tokio::spawn(async move { engine.sync_pending_entries().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    // what `scout-sync pit add` does while `watch` is mid-pass
    let other = QueueManager::open(Database::open_at(&db_path).unwrap(), SyncConfig::default())
        .unwrap();
    assert_eq!(
        other.get(&id).unwrap().unwrap().status,
        EntryStatus::Syncing
    );

    let result = pass.await.unwrap().unwrap();
    assert_eq!(result.synced, 1);
    assert_eq!(result.unrecorded, 0);

    let entry = h.engine.queue().get(&id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Synced);
    assert_eq!(entry.remote_id, Some(42));

    let again = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(again.total(), 0);
    assert_eq!(h.remote.calls(), vec![254]);
}

#[tokio::test]
async fn unknown_entry_kind_does_not_block_the_queue() {
    let db = Database::open_in_memory().unwrap();
    db.connection()
        .execute(
            "INSERT INTO queue_entries (id, kind, payload, status, created_at)
             VALUES ('odd', 'scoreboard', '{}', 'pending', '2026-03-01T10:00:00.000000Z')",
            [],
        )
        .unwrap();
    let h = harness_with(db, FakeRemote::new(), SyncConfig::default(), true);
    let good = h.engine.enqueue(&pit(254)).unwrap();

    let result = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(result.synced, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(h.remote.calls(), vec![254]);
    assert_eq!(
        h.engine.queue().get(&good).unwrap().unwrap().status,
        EntryStatus::Synced
    );

    let stats = h.engine.stats().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.exhausted, 1);
}

#[tokio::test]
async fn failing_entry_exhausts_retries_until_manual_retry() {
    let config = SyncConfig {
        max_retries: 2,
        ..SyncConfig::default()
    };
    let h = harness(FakeRemote::new().failing(2), config, true);
    let id = h.engine.enqueue(&match_record(7, 1678)).unwrap();

    assert_eq!(h.engine.sync_pending_entries().await.unwrap().failed, 1);
    assert_eq!(h.engine.sync_pending_entries().await.unwrap().failed, 1);

    let entry = h.engine.queue().get(&id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.last_error.as_deref(), Some("network unreachable: simulated outage"));

    // excluded from automatic passes
    let result = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(result.total(), 0);
    assert_eq!(h.remote.calls().len(), 2);
    assert_eq!(h.engine.stats().unwrap().exhausted, 1);

    let result = h.engine.retry_failed_entries().await.unwrap();
    assert_eq!(result.synced, 1);
    let entry = h.engine.queue().get(&id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Synced);
    assert_eq!(entry.remote_id, Some(42));
    assert!(entry.last_error.is_none());
}

#[tokio::test]
async fn submissions_start_in_creation_order() {
    let h = harness(FakeRemote::new(), SyncConfig::default(), true);
    for team in [11, 22, 33] {
        h.engine.enqueue(&pit(team)).unwrap();
    }

    h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(h.remote.calls(), vec![11, 22, 33]);
}

#[tokio::test]
async fn batches_bound_concurrency_and_run_in_sequence() {
    let config = SyncConfig {
        batch_size: 2,
        ..SyncConfig::default()
    };
    let h = harness(
        FakeRemote::new().with_latency(Duration::from_millis(20)),
        config,
        true,
    );
    for team in 1..=5 {
        h.engine.enqueue(&pit(team)).unwrap();
    }

    let result = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(result.synced, 5);
    assert_eq!(h.remote.max_in_flight(), 2);
    assert_eq!(h.remote.calls(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn one_failure_does_not_abort_the_pass() {
    let config = SyncConfig {
        batch_size: 1,
        ..SyncConfig::default()
    };
    let h = harness(FakeRemote::new().failing(1), config, true);
    for team in 1..=3 {
        h.engine.enqueue(&pit(team)).unwrap();
    }

    let result = h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(result.failed, 1);
    assert_eq!(result.synced, 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(h.engine.pending_count().unwrap(), 1);
}

#[tokio::test]
async fn reconnect_triggers_auto_sync() {
    let h = harness(FakeRemote::new(), SyncConfig::default(), false);
    let id = h.engine.enqueue(&pit(254)).unwrap();
    assert_eq!(h.engine.pending_count().unwrap(), 1);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    h.engine.subscribe(move |result| {
        let _ = tx.send(result.clone());
    });
    let task = spawn_auto_sync(Arc::clone(&h.engine));

    h.network.set_online(true);

    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.synced, 1);

    let entry = h.engine.queue().get(&id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Synced);
    assert_eq!(entry.remote_id, Some(42));
    assert_eq!(h.engine.pending_count().unwrap(), 0);
    task.abort();
}

#[tokio::test]
async fn auto_sync_backs_off_and_retries_failed_pass() {
    let config = SyncConfig {
        retry_delay_ms: 20,
        ..SyncConfig::default()
    };
    let h = harness(FakeRemote::new().failing(1), config, true);
    h.engine.enqueue(&pit(254)).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    h.engine.subscribe(move |result| {
        let _ = tx.send(result.clone());
    });
    let task = spawn_auto_sync(Arc::clone(&h.engine));

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.failed, 1);

    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.synced, 1);
    assert_eq!(h.remote.calls().len(), 2);
    task.abort();
}

#[tokio::test]
async fn auto_sync_respects_disabled_flag() {
    let config = SyncConfig {
        auto_sync_enabled: false,
        ..SyncConfig::default()
    };
    let h = harness(FakeRemote::new(), config, false);
    h.engine.enqueue(&pit(254)).unwrap();

    let task = spawn_auto_sync(Arc::clone(&h.engine));
    h.network.set_online(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.remote.calls().is_empty());
    assert_eq!(h.engine.pending_count().unwrap(), 1);
    task.abort();
}

#[tokio::test]
async fn clear_removes_only_synced_entries() {
    let config = SyncConfig {
        batch_size: 1,
        ..SyncConfig::default()
    };
    let h = harness(FakeRemote::new(), config, true);
    h.engine.enqueue(&pit(1)).unwrap();
    h.engine.enqueue(&pit(2)).unwrap();
    h.engine.sync_pending_entries().await.unwrap();

    h.remote.fail_next(1);
    let failed = h.engine.enqueue(&pit(3)).unwrap();
    h.engine.sync_pending_entries().await.unwrap();
    h.network.set_online(false);
    let pending = h.engine.enqueue(&pit(4)).unwrap();

    assert_eq!(h.engine.clear_synced_entries().unwrap(), 2);
    assert_eq!(h.engine.total_queued_count().unwrap(), 2);
    assert_eq!(
        h.engine.queue().get(&failed).unwrap().unwrap().status,
        EntryStatus::Error
    );
    assert_eq!(
        h.engine.queue().get(&pending).unwrap().unwrap().status,
        EntryStatus::Pending
    );
}

#[tokio::test]
async fn listeners_run_in_registration_order_after_commit() {
    let h = harness(FakeRemote::new(), SyncConfig::default(), true);
    let id = h.engine.enqueue(&pit(254)).unwrap();

    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        let engine = Arc::clone(&h.engine);
        let id = id.clone();
        h.engine.subscribe(move |_| {
            // terminal state is already committed when listeners run
            let status = engine.queue().get(&id).unwrap().unwrap().status;
            order.lock().push((name, status));
        });
    }

    h.engine.sync_pending_entries().await.unwrap();
    assert_eq!(
        *order.lock(),
        vec![
            ("first", EntryStatus::Synced),
            ("second", EntryStatus::Synced),
            ("third", EntryStatus::Synced)
        ]
    );
}
