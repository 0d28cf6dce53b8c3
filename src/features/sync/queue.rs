//! Queue manager: storage, status transitions and listeners for queued entries.
//!
//! The queue manager is the only writer of entry status. Every transition is
//! a single conditional `UPDATE`, so a transition that does not apply (for
//! example marking an already-syncing entry as syncing) changes nothing and
//! reports `false`.
//!
//! Several processes may open the same database. Each [`QueueManager`] has its
//! own owner token; `mark_syncing` records that token as the entry's claim and
//! only the claimant may finish the transition. The reload repair releases a
//! claim only when it belongs to this handle, has no owner, or is older than
//! the claim lease, so opening the queue never steals an entry another live
//! process is delivering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use super::config::SyncConfig;
use super::entry::{from_stored_time, to_stored_time, EntryId, EntryStatus, QueuedEntry};
use super::orchestrator::SyncResult;
use crate::error::ScoutError;
use crate::remote::RemoteId;
use crate::scouting::{EntryKind, ScoutingRecord};
use crate::storage::Database;

/// Handle returned by [`QueueManager::subscribe`].
pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&SyncResult) + Send + Sync>;

/// How long a `syncing` claim protects an entry from the reload repair of
/// another process. Must exceed the longest remote call.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(120);

const KNOWN_KINDS: &str = "kind IN ('pit', 'match')";

const ENTRY_COLUMNS: &str = "id, kind, payload, status, created_at, last_attempt, attempts, \
                             last_error, remote_id, synced_at";

/// Owner of the durable entry queue.
pub struct QueueManager {
    db: Database,
    owner: String,
    claim_lease: chrono::Duration,
    config: RwLock<SyncConfig>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl QueueManager {
    /// Load the queue from `db`.
    ///
    /// Loads the persisted sync configuration (storing `seed` if there is
    /// none yet) and releases abandoned `syncing` claims back to `pending`
    /// before returning. Uses [`DEFAULT_CLAIM_LEASE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or written or the
    /// repair step fails.
    pub fn open(db: Database, seed: SyncConfig) -> Result<Self, ScoutError> {
        Self::open_with_lease(db, seed, DEFAULT_CLAIM_LEASE)
    }

    /// Same as [`Self::open`] with an explicit claim lease.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open`].
    pub fn open_with_lease(
        db: Database,
        seed: SyncConfig,
        claim_lease: Duration,
    ) -> Result<Self, ScoutError> {
        let config = {
            let conn = db.connection();
            if let Some(stored) = load_config(&conn)? {
                stored
            } else {
                seed.validate()?;
                save_config(&conn, &seed)?;
                seed
            }
        };

        let queue = Self {
            db,
            owner: Uuid::new_v4().to_string(),
            claim_lease: chrono::Duration::from_std(claim_lease)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
            config: RwLock::new(config),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        };

        queue.recover_interrupted()?;
        Ok(queue)
    }

    /// Current sync configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        *self.config.read()
    }

    /// Replace the sync configuration and persist it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or cannot be saved;
    /// the in-memory configuration is unchanged in that case.
    pub fn set_sync_config(&self, config: SyncConfig) -> Result<(), ScoutError> {
        config.validate()?;
        save_config(&self.db.connection(), &config)?;
        *self.config.write() = config;
        tracing::info!(?config, "sync config updated");
        Ok(())
    }

    /// Queue a record for delivery. Local write only.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid or cannot be stored.
    pub fn enqueue(&self, record: &ScoutingRecord) -> Result<EntryId, ScoutError> {
        let entry = QueuedEntry::new(record)?;
        self.insert(&entry)?;
        tracing::debug!(id = %entry.id, kind = %entry.kind, "entry queued");
        Ok(entry.id)
    }

    /// Store a fully built entry.
    pub(crate) fn insert(&self, entry: &QueuedEntry) -> Result<(), ScoutError> {
        self.db
            .connection()
            .execute(
                r"INSERT INTO queue_entries
                  (id, kind, payload, status, created_at, last_attempt, attempts,
                   last_error, remote_id, synced_at)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    entry.id,
                    entry.kind.as_str(),
                    entry.payload,
                    entry.status.as_str(),
                    to_stored_time(entry.created_at),
                    entry.last_attempt.map(to_stored_time),
                    entry.attempts,
                    entry.last_error,
                    entry.remote_id,
                    entry.synced_at.map(to_stored_time),
                ],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to enqueue entry: {e}")))?;
        Ok(())
    }

    /// Get a specific entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: &str) -> Result<Option<QueuedEntry>, ScoutError> {
        let conn = self.db.connection();
        conn.query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1"),
            [id],
            row_to_entry,
        )
        .optional()
        .map_err(|e| ScoutError::Database(format!("Failed to query entry: {e}")))
    }

    /// List entries, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(
        &self,
        status: Option<EntryStatus>,
        limit: usize,
    ) -> Result<Vec<QueuedEntry>, ScoutError> {
        let conn = self.db.connection();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        match status {
            Some(status) => query_entries(
                &conn,
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE status = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                ),
                params![status.as_str(), limit],
            ),
            None => query_entries(
                &conn,
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM queue_entries
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                params![limit],
            ),
        }
    }

    /// Entries an automatic pass should deliver, oldest first.
    ///
    /// Entries of a kind this build does not know are moved to `error` with
    /// no attempts left instead of being returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn eligible_entries(&self, max_retries: u32) -> Result<Vec<QueuedEntry>, ScoutError> {
        let conn = self.db.connection();
        quarantine_unknown_kinds(&conn, max_retries)?;
        query_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries
                 WHERE status IN ('pending', 'error') AND attempts < ?1 AND {KNOWN_KINDS}
                 ORDER BY created_at ASC, rowid ASC"
            ),
            params![max_retries],
        )
    }

    /// `pending | error → syncing`, claimed by this handle.
    ///
    /// Returns `false` without touching the entry if it is already syncing,
    /// already synced, or missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_syncing(&self, id: &str) -> Result<bool, ScoutError> {
        let rows = self
            .db
            .connection()
            .execute(
                "UPDATE queue_entries SET status = 'syncing', claimed_by = ?2, claimed_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'error')",
                params![id, self.owner, to_stored_time(Utc::now())],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to mark entry syncing: {e}")))?;
        if rows == 1 {
            tracing::debug!(%id, "entry syncing");
        }
        Ok(rows == 1)
    }

    /// `syncing → synced`, storing the server id and clearing the last error.
    ///
    /// Returns `false` if the entry is no longer syncing under this handle's
    /// claim; nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_synced(&self, id: &str, remote_id: RemoteId) -> Result<bool, ScoutError> {
        let now = to_stored_time(Utc::now());
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE queue_entries SET
                  status = 'synced',
                  remote_id = ?1,
                  last_error = NULL,
                  last_attempt = ?2,
                  synced_at = ?2,
                  attempts = attempts + 1,
                  claimed_by = NULL,
                  claimed_at = NULL
                  WHERE id = ?3 AND status = 'syncing' AND claimed_by = ?4",
                params![remote_id, now, id, self.owner],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to mark entry synced: {e}")))?;
        if rows == 1 {
            tracing::debug!(%id, remote_id, "entry synced");
        }
        Ok(rows == 1)
    }

    /// `syncing → error`, counting the attempt and recording the cause.
    ///
    /// Returns `false` if the entry is no longer syncing under this handle's
    /// claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_error(&self, id: &str, message: &str) -> Result<bool, ScoutError> {
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE queue_entries SET
                  status = 'error',
                  last_error = ?1,
                  last_attempt = ?2,
                  attempts = attempts + 1,
                  claimed_by = NULL,
                  claimed_at = NULL
                  WHERE id = ?3 AND status = 'syncing' AND claimed_by = ?4",
                params![message, to_stored_time(Utc::now()), id, self.owner],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to mark entry failed: {e}")))?;
        Ok(rows == 1)
    }

    /// Move every `error` entry of a known kind back to `pending` with its
    /// attempts reset.
    ///
    /// Returns the reset entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is reset then.
    pub fn reset_failed(&self) -> Result<Vec<QueuedEntry>, ScoutError> {
        let mut conn = self.db.connection();
        let tx = conn
            .transaction()
            .map_err(|e| ScoutError::Database(format!("Failed to begin transaction: {e}")))?;

        let mut entries = query_entries(
            &tx,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE status = 'error' AND {KNOWN_KINDS}
                 ORDER BY created_at ASC, rowid ASC"
            ),
            [],
        )?;

        tx.execute(
            &format!(
                "UPDATE queue_entries SET status = 'pending', attempts = 0
                 WHERE status = 'error' AND {KNOWN_KINDS}"
            ),
            [],
        )
        .map_err(|e| ScoutError::Database(format!("Failed to reset failed entries: {e}")))?;

        tx.commit()
            .map_err(|e| ScoutError::Database(format!("Failed to commit reset: {e}")))?;

        for entry in &mut entries {
            entry.status = EntryStatus::Pending;
            entry.attempts = 0;
        }
        Ok(entries)
    }

    /// Rewrite entries left `syncing` by an interrupted pass to `pending`.
    ///
    /// Releases this handle's own claims, claims without an owner, and claims
    /// older than the claim lease. A fresh claim held by another handle is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn recover_interrupted(&self) -> Result<usize, ScoutError> {
        let stale_before = to_stored_time(Utc::now() - self.claim_lease);
        let rows = self
            .db
            .connection()
            .execute(
                r"UPDATE queue_entries SET status = 'pending', claimed_by = NULL, claimed_at = NULL
                  WHERE status = 'syncing' AND (
                    claimed_by IS NULL OR claimed_by = ?1
                    OR claimed_at IS NULL OR claimed_at < ?2
                  )",
                params![self.owner, stale_before],
            )
            .map_err(|e| {
                ScoutError::Database(format!("Failed to recover interrupted entries: {e}"))
            })?;
        if rows > 0 {
            tracing::warn!(count = rows, "reset interrupted entries to pending");
        }
        Ok(rows)
    }

    /// Number of entries not yet synced.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pending_count(&self) -> Result<usize, ScoutError> {
        self.count("SELECT COUNT(*) FROM queue_entries WHERE status != 'synced'")
    }

    /// Number of entries in the queue, synced ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn total_queued_count(&self) -> Result<usize, ScoutError> {
        self.count("SELECT COUNT(*) FROM queue_entries")
    }

    fn count(&self, sql: &str) -> Result<usize, ScoutError> {
        let n: i64 = self
            .db
            .connection()
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| ScoutError::Database(format!("Failed to count entries: {e}")))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<QueueStats, ScoutError> {
        let max_retries = self.sync_config().max_retries;
        let conn = self.db.connection();

        let mut stats = QueueStats::default();
        let mut stmt = conn
            .prepare(
                r"SELECT status, COUNT(*), SUM(CASE WHEN attempts >= ?1 THEN 1 ELSE 0 END)
                  FROM queue_entries GROUP BY status",
            )
            .map_err(|e| ScoutError::Database(format!("Failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map([max_retries], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(|e| ScoutError::Database(format!("Failed to count entries: {e}")))?;

        for row in rows {
            let (status, count, over_limit) =
                row.map_err(|e| ScoutError::Database(e.to_string()))?;
            let count = usize::try_from(count).unwrap_or(0);
            match EntryStatus::from_string(&status) {
                EntryStatus::Pending => stats.pending += count,
                EntryStatus::Syncing => stats.syncing += count,
                EntryStatus::Synced => stats.synced += count,
                EntryStatus::Error => {
                    stats.failed += count;
                    stats.exhausted += usize::try_from(over_limit).unwrap_or(0);
                }
            }
            stats.total += count;
        }

        let oldest: Option<String> = conn
            .query_row(
                "SELECT created_at FROM queue_entries WHERE status != 'synced'
                 ORDER BY created_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ScoutError::Database(format!("Failed to get oldest pending: {e}")))?;
        stats.oldest_pending = oldest.as_deref().and_then(from_stored_time);

        Ok(stats)
    }

    /// Delete every synced entry. Pending and error entries are never touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_synced_entries(&self) -> Result<usize, ScoutError> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM queue_entries WHERE status = 'synced'", [])
            .map_err(|e| ScoutError::Database(format!("Failed to clear synced entries: {e}")))?;
        tracing::debug!(count = rows, "cleared synced entries");
        Ok(rows)
    }

    /// Retention policy for synced entries: drop those synced before
    /// `now - retention`, then keep at most `max_keep` of the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_synced(
        &self,
        retention: chrono::Duration,
        max_keep: usize,
    ) -> Result<usize, ScoutError> {
        let cutoff = to_stored_time(Utc::now() - retention);
        let max_keep = i64::try_from(max_keep).unwrap_or(i64::MAX);
        let conn = self.db.connection();

        let expired = conn
            .execute(
                "DELETE FROM queue_entries
                 WHERE status = 'synced' AND COALESCE(synced_at, created_at) < ?1",
                [cutoff],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to prune synced entries: {e}")))?;

        let overflow = conn
            .execute(
                r"DELETE FROM queue_entries WHERE status = 'synced' AND id NOT IN (
                    SELECT id FROM queue_entries WHERE status = 'synced'
                    ORDER BY COALESCE(synced_at, created_at) DESC, rowid DESC LIMIT ?1
                  )",
                [max_keep],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to prune synced entries: {e}")))?;

        Ok(expired + overflow)
    }

    /// Discard a single entry that has not been delivered.
    ///
    /// In-flight and synced entries are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&self, id: &str) -> Result<bool, ScoutError> {
        let rows = self
            .db
            .connection()
            .execute(
                "DELETE FROM queue_entries WHERE id = ?1 AND status IN ('pending', 'error')",
                [id],
            )
            .map_err(|e| ScoutError::Database(format!("Failed to delete entry: {e}")))?;
        Ok(rows > 0)
    }

    /// Register a listener for sync-pass completion.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncResult) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Call every listener with `result`, in registration order.
    ///
    /// The listener list is snapshotted first, so a listener may subscribe
    /// or unsubscribe without deadlocking.
    pub fn notify_listeners(&self, result: &SyncResult) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(result);
        }
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Entries waiting for a pass
    pub pending: usize,
    /// Entries in flight
    pub syncing: usize,
    /// Delivered entries still retained locally
    pub synced: usize,
    /// Entries whose last attempt failed
    pub failed: usize,
    /// Failed entries with no automatic retries left
    pub exhausted: usize,
    /// All entries
    pub total: usize,
    /// Oldest undelivered entry
    pub oldest_pending: Option<DateTime<Utc>>,
}

impl QueueStats {
    /// Entries not yet delivered.
    #[must_use]
    pub const fn undelivered(&self) -> usize {
        self.pending + self.syncing + self.failed
    }
}

fn load_config(conn: &Connection) -> Result<Option<SyncConfig>, ScoutError> {
    let stored: Option<String> = conn
        .query_row("SELECT value FROM sync_config WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| ScoutError::Database(format!("Failed to load sync config: {e}")))?;

    match stored {
        Some(json) => match serde_json::from_str::<SyncConfig>(&json) {
            Ok(config) if config.validate().is_ok() => Ok(Some(config)),
            Ok(_) | Err(_) => {
                tracing::warn!("stored sync config is unusable, reseeding");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

fn save_config(conn: &Connection, config: &SyncConfig) -> Result<(), ScoutError> {
    let json = serde_json::to_string(config)?;
    conn.execute(
        r"INSERT INTO sync_config (id, value) VALUES (1, ?1)
          ON CONFLICT(id) DO UPDATE SET value = excluded.value",
        [json],
    )
    .map_err(|e| ScoutError::Database(format!("Failed to save sync config: {e}")))?;
    Ok(())
}

fn query_entries<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<QueuedEntry>, ScoutError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ScoutError::Database(format!("Failed to prepare query: {e}")))?;

    let rows = stmt
        .query_map(params, row_to_entry)
        .map_err(|e| ScoutError::Database(format!("Failed to query entries: {e}")))?;

    let mut entries = Vec::new();
    for row in rows {
        match row {
            Ok(entry) => entries.push(entry),
            Err(e @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
            }
            Err(e) => return Err(ScoutError::Database(e.to_string())),
        }
    }
    Ok(entries)
}

/// Park entries whose kind this build cannot submit as exhausted errors.
fn quarantine_unknown_kinds(conn: &Connection, max_retries: u32) -> Result<usize, ScoutError> {
    let rows = conn
        .execute(
            &format!(
                r"UPDATE queue_entries SET
                  status = 'error',
                  last_error = 'unknown entry kind: ' || kind,
                  attempts = MAX(attempts, ?1),
                  claimed_by = NULL,
                  claimed_at = NULL
                  WHERE NOT ({KNOWN_KINDS}) AND status != 'synced'
                  AND (status != 'error' OR attempts < ?1)"
            ),
            [max_retries],
        )
        .map_err(|e| ScoutError::Database(format!("Failed to flag unknown entries: {e}")))?;
    if rows > 0 {
        tracing::warn!(count = rows, "entries with an unknown kind moved to error");
    }
    Ok(rows)
}

fn row_to_entry(row: &Row<'_>) -> Result<QueuedEntry, rusqlite::Error> {
    let kind_str: String = row.get(1)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let last_attempt_str: Option<String> = row.get(5)?;
    let synced_at_str: Option<String> = row.get(9)?;

    let kind = EntryKind::parse(&kind_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(QueuedEntry {
        id: row.get(0)?,
        kind,
        payload: row.get(2)?,
        status: EntryStatus::from_string(&status_str),
        created_at: from_stored_time(&created_at_str).unwrap_or_else(Utc::now),
        last_attempt: last_attempt_str.as_deref().and_then(from_stored_time),
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        remote_id: row.get(8)?,
        synced_at: synced_at_str.as_deref().and_then(from_stored_time),
    })
}
