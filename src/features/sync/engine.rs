//! The sync engine: one explicitly constructed instance per process that the
//! UI binding layer talks to.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use super::config::SyncConfig;
use super::entry::EntryId;
use super::network::{Connectivity, NetworkMonitor};
use super::orchestrator::{SyncOrchestrator, SyncProgress, SyncResult};
use super::queue::{ListenerId, QueueManager, QueueStats, DEFAULT_CLAIM_LEASE};
use crate::error::ScoutError;
use crate::remote::RemoteClient;
use crate::scouting::ScoutingRecord;
use crate::storage::Database;

/// Engine settings that are not part of the persisted [`SyncConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Time a reconnect must hold before auto-sync fires
    pub settle_delay: Duration,
    /// Synced entries older than this are pruned after each pass
    pub synced_retention: chrono::Duration,
    /// At most this many synced entries are kept
    pub max_synced_entries: usize,
    /// Age after which another process's `syncing` claim counts as abandoned
    pub claim_lease: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            synced_retention: chrono::Duration::hours(24),
            max_synced_entries: 500,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }
}

/// Snapshot for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub pending: usize,
    pub total: usize,
    pub stats: QueueStats,
    pub in_progress: bool,
    pub connectivity: Connectivity,
    pub config: SyncConfig,
    pub last_result: Option<SyncResult>,
}

pub struct ScoutSync {
    queue: Arc<QueueManager>,
    network: Arc<NetworkMonitor>,
    orchestrator: SyncOrchestrator,
    options: EngineOptions,
    last_result: Mutex<Option<SyncResult>>,
}

impl ScoutSync {
    /// Load the queue from `db` and wire it to `remote` and `network`.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be loaded.
    pub fn new(
        db: Database,
        seed: SyncConfig,
        remote: Arc<dyn RemoteClient>,
        network: Arc<NetworkMonitor>,
        options: EngineOptions,
    ) -> Result<Self, ScoutError> {
        let queue = Arc::new(QueueManager::open_with_lease(
            db,
            seed,
            options.claim_lease,
        )?);
        let orchestrator =
            SyncOrchestrator::new(Arc::clone(&queue), remote, Arc::clone(&network));
        Ok(Self {
            queue,
            network,
            orchestrator,
            options,
            last_result: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    #[must_use]
    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Queue a record. Never touches the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid or cannot be stored.
    pub fn enqueue(&self, record: &ScoutingRecord) -> Result<EntryId, ScoutError> {
        self.queue.enqueue(record)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pending_count(&self) -> Result<usize, ScoutError> {
        self.queue.pending_count()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn total_queued_count(&self) -> Result<usize, ScoutError> {
        self.queue.total_queued_count()
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<QueueStats, ScoutError> {
        self.queue.stats()
    }

    /// Run a sync pass over every eligible entry.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Offline`, `ScoutError::SyncInProgress`, or a
    /// storage error.
    pub async fn sync_pending_entries(&self) -> Result<SyncResult, ScoutError> {
        let result = self.orchestrator.sync_pending_entries().await?;
        self.finish_pass(&result);
        Ok(result)
    }

    /// Reset and resubmit every failed entry.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sync_pending_entries`].
    pub async fn retry_failed_entries(&self) -> Result<SyncResult, ScoutError> {
        let result = self.orchestrator.retry_failed_entries().await?;
        self.finish_pass(&result);
        Ok(result)
    }

    /// The pass triggered by the network monitor.
    ///
    /// Returns `None` without syncing when auto-sync is disabled or nothing
    /// is waiting.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sync_pending_entries`].
    pub async fn auto_sync_pass(&self) -> Result<Option<SyncResult>, ScoutError> {
        if !self.queue.sync_config().auto_sync_enabled {
            tracing::debug!("auto-sync disabled");
            return Ok(None);
        }
        if self.queue.pending_count()? == 0 {
            tracing::debug!("nothing to sync");
            return Ok(None);
        }
        self.sync_pending_entries().await.map(Some)
    }

    /// Bookkeeping after a committed pass. Retention is best effort: the
    /// pass result stands even if pruning fails.
    fn finish_pass(&self, result: &SyncResult) {
        *self.last_result.lock() = Some(result.clone());
        match self
            .queue
            .prune_synced(self.options.synced_retention, self.options.max_synced_entries)
        {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(count = pruned, "pruned synced entries"),
            Err(e) => tracing::warn!(error = %e, "could not prune synced entries"),
        }
    }

    /// Delete every synced entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_synced_entries(&self) -> Result<usize, ScoutError> {
        self.queue.clear_synced_entries()
    }

    #[must_use]
    pub fn is_sync_in_progress(&self) -> bool {
        self.orchestrator.is_sync_in_progress()
    }

    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        self.queue.sync_config()
    }

    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or cannot be saved.
    pub fn set_sync_config(&self, config: SyncConfig) -> Result<(), ScoutError> {
        self.queue.set_sync_config(config)
    }

    /// Register a sync-completion listener.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncResult) + Send + Sync + 'static,
    {
        self.queue.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.queue.unsubscribe(id)
    }

    #[must_use]
    pub fn progress(&self) -> watch::Receiver<SyncProgress> {
        self.orchestrator.progress()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<SyncResult> {
        self.last_result.lock().clone()
    }

    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn status(&self) -> Result<SyncStatus, ScoutError> {
        let stats = self.queue.stats()?;
        Ok(SyncStatus {
            pending: stats.undelivered(),
            total: stats.total,
            stats,
            in_progress: self.is_sync_in_progress(),
            connectivity: self.network.snapshot(),
            config: self.sync_config(),
            last_result: self.last_result(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemoteClient;
    use crate::scouting::PitEntry;

    fn create_engine(remote: MockRemoteClient, online: bool) -> ScoutSync {
        ScoutSync::new(
            Database::open_in_memory().unwrap(),
            SyncConfig::default(),
            Arc::new(remote),
            Arc::new(NetworkMonitor::new(online)),
            EngineOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_auto_pass_skipped_when_disabled() {
        let mut remote = MockRemoteClient::new();
        remote.expect_create_pit_entry().never();
        let engine = create_engine(remote, true);
        engine
            .enqueue(&ScoutingRecord::from(PitEntry::new("2026casj", 254)))
            .unwrap();

        let mut config = engine.sync_config();
        config.auto_sync_enabled = false;
        engine.set_sync_config(config).unwrap();

        assert!(engine.auto_sync_pass().await.unwrap().is_none());
        assert_eq!(engine.pending_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_auto_pass_skipped_when_empty() {
        let engine = create_engine(MockRemoteClient::new(), true);
        assert!(engine.auto_sync_pass().await.unwrap().is_none());
        assert!(engine.last_result().is_none());
    }

    #[tokio::test]
    async fn test_status_reports_last_result() {
        let mut remote = MockRemoteClient::new();
        remote.expect_create_pit_entry().returning(|_| Ok(42));
        let engine = create_engine(remote, true);
        engine
            .enqueue(&ScoutingRecord::from(PitEntry::new("2026casj", 254)))
            .unwrap();

        engine.sync_pending_entries().await.unwrap();

        let status = engine.status().unwrap();
        assert_eq!(status.pending, 0);
        assert_eq!(status.total, 1);
        assert!(status.connectivity.online);
        assert_eq!(status.last_result.map(|r| r.synced), Some(1));
    }

    #[tokio::test]
    async fn test_pass_prunes_beyond_cap() {
        let mut remote = MockRemoteClient::new();
        remote.expect_create_pit_entry().returning(|_| Ok(1));
        let engine = ScoutSync::new(
            Database::open_in_memory().unwrap(),
            SyncConfig::default(),
            Arc::new(remote),
            Arc::new(NetworkMonitor::new(true)),
            EngineOptions {
                max_synced_entries: 1,
                ..EngineOptions::default()
            },
        )
        .unwrap();
        for team in [1, 2, 3] {
            engine
                .enqueue(&ScoutingRecord::from(PitEntry::new("2026casj", team)))
                .unwrap();
        }

        let result = engine.sync_pending_entries().await.unwrap();
        assert_eq!(result.synced, 3);
        assert_eq!(engine.total_queued_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prune_failure_keeps_pass_result() {
        let db = Database::open_in_memory().unwrap();
        db.connection()
            .execute_batch(
                r"CREATE TRIGGER keep_synced BEFORE DELETE ON queue_entries
                  BEGIN SELECT RAISE(ABORT, 'deletes disabled'); END;",
            )
            .unwrap();

        let mut remote = MockRemoteClient::new();
        remote.expect_create_pit_entry().returning(|_| Ok(42));
        let engine = ScoutSync::new(
            db,
            SyncConfig::default(),
            Arc::new(remote),
            Arc::new(NetworkMonitor::new(true)),
            EngineOptions {
                max_synced_entries: 0,
                ..EngineOptions::default()
            },
        )
        .unwrap();
        engine
            .enqueue(&ScoutingRecord::from(PitEntry::new("2026casj", 254)))
            .unwrap();

        let result = engine.sync_pending_entries().await.unwrap();
        assert_eq!(result.synced, 1);
        assert_eq!(engine.last_result().map(|r| r.synced), Some(1));
        assert_eq!(engine.stats().unwrap().synced, 1);
    }
}
