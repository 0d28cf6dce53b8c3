//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use scout_sync::features::sync::{EngineOptions, NetworkMonitor, ScoutSync, SyncConfig};
use scout_sync::remote::{RemoteClient, RemoteError, RemoteId};
use scout_sync::scouting::{MatchEntry, PitEntry, ScoutingRecord};
use scout_sync::storage::Database;

/// Scripted stand-in for the scouting API.
///
/// Records the team number of every create call in call order, tracks how
/// many calls overlap, and fails the first `failures` calls with a
/// transport error.
pub struct FakeRemote {
    calls: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failures: AtomicU32,
    next_id: AtomicI64,
    latency: Duration,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            failures: AtomicU32::new(0),
            next_id: AtomicI64::new(42),
            latency: Duration::from_millis(5),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn fail_next(&self, failures: u32) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn create(&self, team: u32) -> Result<RemoteId, RemoteError> {
        self.calls.lock().push(team);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            Err(RemoteError::Transport("simulated outage".to_string()))
        } else {
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn create_pit_entry(&self, entry: &PitEntry) -> Result<RemoteId, RemoteError> {
        self.create(entry.team_number).await
    }

    async fn create_match_entry(&self, entry: &MatchEntry) -> Result<RemoteId, RemoteError> {
        self.create(entry.team_number).await
    }

    async fn update_pit_entry(&self, _id: RemoteId, _changes: &Value) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn update_match_entry(
        &self,
        _id: RemoteId,
        _changes: &Value,
    ) -> Result<(), RemoteError> {
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<ScoutSync>,
    pub network: Arc<NetworkMonitor>,
    pub remote: Arc<FakeRemote>,
}

pub fn harness(remote: FakeRemote, config: SyncConfig, online: bool) -> Harness {
    harness_with(Database::open_in_memory().unwrap(), remote, config, online)
}

pub fn harness_with(
    db: Database,
    remote: FakeRemote,
    config: SyncConfig,
    online: bool,
) -> Harness {
    harness_with_options(db, remote, config, online, test_options())
}

pub fn test_options() -> EngineOptions {
    EngineOptions {
        settle_delay: Duration::from_millis(20),
        ..EngineOptions::default()
    }
}

pub fn harness_with_options(
    db: Database,
    remote: FakeRemote,
    config: SyncConfig,
    online: bool,
    options: EngineOptions,
) -> Harness {
    let remote = Arc::new(remote);
    let network = Arc::new(NetworkMonitor::new(online));
    let engine = ScoutSync::new(
        db,
        config,
        Arc::clone(&remote) as Arc<dyn RemoteClient>,
        Arc::clone(&network),
        options,
    )
    .unwrap();

    Harness {
        engine: Arc::new(engine),
        network,
        remote,
    }
}

pub fn pit(team: u32) -> ScoutingRecord {
    ScoutingRecord::from(PitEntry::new("2026casj", team))
}

pub fn match_record(match_number: u32, team: u32) -> ScoutingRecord {
    ScoutingRecord::from(MatchEntry::new("2026casj", match_number, team))
}
