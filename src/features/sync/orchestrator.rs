//! Sync orchestrator: drives sync passes over the queue.
//!
//! A pass selects the eligible entries oldest first, splits them into
//! batches of at most `batch_size`, submits each batch concurrently and runs
//! the batches one after another. Per-entry failures are recorded on the
//! entry and aggregated into the [`SyncResult`]; only storage errors and the
//! two invariant violations (offline, already running) reach the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;

use super::entry::{EntryId, QueuedEntry};
use super::network::NetworkMonitor;
use super::queue::QueueManager;
use crate::error::ScoutError;
use crate::remote::{submit, RemoteClient, RemoteId};
use crate::scouting::EntryKind;

/// What happened to one entry during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Synced { remote_id: RemoteId },
    Failed { message: String },
    /// The entry was no longer pending when the pass reached it.
    Skipped,
    /// The call finished but the entry had been released by a reload repair
    /// in the meantime, so the store was left unchanged.
    Unrecorded { remote_id: Option<RemoteId> },
}

/// Per-entry record of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub id: EntryId,
    pub kind: EntryKind,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Entries acknowledged by the server
    pub synced: usize,
    /// Entries whose submission failed
    pub failed: usize,
    /// Entries taken by someone else before the pass reached them
    pub skipped: usize,
    /// Entries whose outcome could not be recorded
    pub unrecorded: usize,
    /// Human-readable causes, one per failed or unrecorded entry
    pub errors: Vec<String>,
    /// Individual outcomes in submission order
    pub outcomes: Vec<EntryOutcome>,
    /// When the pass finished
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    /// Create an empty result.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            synced: 0,
            failed: 0,
            skipped: 0,
            unrecorded: 0,
            errors: Vec::new(),
            outcomes: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add an outcome.
    pub fn add(&mut self, outcome: EntryOutcome) {
        match &outcome.outcome {
            Outcome::Synced { .. } => self.synced += 1,
            Outcome::Failed { message } => {
                self.failed += 1;
                self.errors
                    .push(format!("{} entry {}: {message}", outcome.kind, outcome.id));
            }
            Outcome::Skipped => self.skipped += 1,
            Outcome::Unrecorded { remote_id } => {
                self.unrecorded += 1;
                let detail = remote_id.map_or_else(
                    || "failure".to_string(),
                    |id| format!("remote id {id}"),
                );
                self.errors.push(format!(
                    "{} entry {}: {detail} not recorded, entry was released mid-flight",
                    outcome.kind, outcome.id
                ));
            }
        }
        self.outcomes.push(outcome);
    }

    /// Check if every attempted entry was delivered and recorded.
    #[must_use]
    pub const fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.unrecorded == 0
    }

    /// Get total entries processed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.synced + self.failed + self.skipped + self.unrecorded
    }
}

/// Progress of the running pass, for progress indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub in_progress: bool,
    pub total: usize,
    pub completed: usize,
}

/// Which entries a pass works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// `pending` or `error` with attempts left.
    Eligible,
    /// Every `error` entry, attempts reset first.
    Failed,
}

/// Releases the in-progress flag when a pass ends, however it ends.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
    progress: &'a watch::Sender<SyncProgress>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.progress.send_modify(|p| p.in_progress = false);
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs sync passes. At most one pass is active at any time.
pub struct SyncOrchestrator {
    queue: Arc<QueueManager>,
    remote: Arc<dyn RemoteClient>,
    network: Arc<NetworkMonitor>,
    in_progress: AtomicBool,
    progress: watch::Sender<SyncProgress>,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        queue: Arc<QueueManager>,
        remote: Arc<dyn RemoteClient>,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        let (progress, _) = watch::channel(SyncProgress::default());
        Self {
            queue,
            remote,
            network,
            in_progress: AtomicBool::new(false),
            progress,
        }
    }

    /// Deliver every eligible entry.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Offline` or `ScoutError::SyncInProgress` without
    /// touching any entry, or a storage error if the queue cannot be read or
    /// updated.
    pub async fn sync_pending_entries(&self) -> Result<SyncResult, ScoutError> {
        self.run_pass(Selection::Eligible).await
    }

    /// Reset attempts on every `error` entry and deliver those entries.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sync_pending_entries`].
    pub async fn retry_failed_entries(&self) -> Result<SyncResult, ScoutError> {
        self.run_pass(Selection::Failed).await
    }

    #[must_use]
    pub fn is_sync_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Watch the progress of the current pass.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    async fn run_pass(&self, selection: Selection) -> Result<SyncResult, ScoutError> {
        if !self.network.is_online() {
            return Err(ScoutError::Offline);
        }
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScoutError::SyncInProgress);
        }
        let _guard = PassGuard {
            flag: &self.in_progress,
            progress: &self.progress,
        };

        // Nothing of ours is in flight here; this only frees abandoned claims.
        self.queue.recover_interrupted()?;

        let config = self.queue.sync_config();
        let entries = match selection {
            Selection::Eligible => self.queue.eligible_entries(config.max_retries)?,
            Selection::Failed => self.queue.reset_failed()?,
        };

        tracing::info!(entries = entries.len(), ?selection, "sync pass started");
        self.progress.send_replace(SyncProgress {
            in_progress: true,
            total: entries.len(),
            completed: 0,
        });

        let mut result = SyncResult::empty();
        for batch in entries.chunks(config.batch_size.max(1)) {
            let outcomes = join_all(batch.iter().map(|entry| self.deliver(entry))).await;

            let mut storage_error = None;
            for outcome in outcomes {
                match outcome {
                    Ok(outcome) => result.add(outcome),
                    Err(e) => storage_error = Some(e),
                }
            }
            if let Some(e) = storage_error {
                tracing::error!(error = %e, "sync pass aborted");
                // Entries of this batch may still be marked syncing.
                if let Err(recover) = self.queue.recover_interrupted() {
                    tracing::error!(error = %recover, "could not release in-flight entries");
                }
                return Err(e);
            }
        }
        result.timestamp = Utc::now();

        tracing::info!(
            synced = result.synced,
            failed = result.failed,
            skipped = result.skipped,
            unrecorded = result.unrecorded,
            "sync pass finished"
        );
        self.queue.notify_listeners(&result);
        Ok(result)
    }

    async fn deliver(&self, entry: &QueuedEntry) -> Result<EntryOutcome, ScoutError> {
        let outcome = self.deliver_inner(entry).await;
        self.progress.send_modify(|p| p.completed += 1);
        Ok(EntryOutcome {
            id: entry.id.clone(),
            kind: entry.kind,
            outcome: outcome?,
        })
    }

    async fn deliver_inner(&self, entry: &QueuedEntry) -> Result<Outcome, ScoutError> {
        if !self.queue.mark_syncing(&entry.id)? {
            tracing::debug!(id = %entry.id, "entry no longer pending, skipping");
            return Ok(Outcome::Skipped);
        }

        let record = match entry.record() {
            Ok(record) => record,
            Err(e) => {
                let message = format!("corrupt payload: {e}");
                tracing::warn!(id = %entry.id, %message, "cannot submit entry");
                return self.record_failure(entry, message);
            }
        };

        match submit(self.remote.as_ref(), &record).await {
            Ok(remote_id) => {
                if self.queue.mark_synced(&entry.id, remote_id)? {
                    Ok(Outcome::Synced { remote_id })
                } else {
                    tracing::error!(
                        id = %entry.id,
                        remote_id,
                        "delivered entry was released mid-flight, result not recorded"
                    );
                    Ok(Outcome::Unrecorded {
                        remote_id: Some(remote_id),
                    })
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    id = %entry.id,
                    kind = %entry.kind,
                    attempt = entry.attempts + 1,
                    error = %message,
                    "submission failed"
                );
                self.record_failure(entry, message)
            }
        }
    }

    fn record_failure(&self, entry: &QueuedEntry, message: String) -> Result<Outcome, ScoutError> {
        if self.queue.mark_error(&entry.id, &message)? {
            Ok(Outcome::Failed { message })
        } else {
            tracing::warn!(id = %entry.id, error = %message, "failed entry was released mid-flight");
            Ok(Outcome::Unrecorded { remote_id: None })
        }
    }
}
