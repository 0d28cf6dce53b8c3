//! Database migrations for scout-sync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened. A database
//! written by a newer build (version above [`CURRENT_VERSION`]) cannot be
//! migrated down, so it is reset to an empty schema instead of failing to load.

use rusqlite::Connection;

use crate::error::ScoutError;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 3;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, ScoutError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| ScoutError::Database(format!("Failed to get schema version: {e}")))
}

/// Set the schema version in the database.
fn set_version(conn: &Connection, version: i32) -> Result<(), ScoutError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| ScoutError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), ScoutError> {
    let mut current = get_version(conn)?;

    if current > CURRENT_VERSION {
        tracing::warn!(
            found = current,
            supported = CURRENT_VERSION,
            "unknown schema version, starting from an empty queue"
        );
        reset(conn)?;
        current = 0;
    }

    if current == CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
        tracing::debug!(version, "applied schema migration");
    }

    Ok(())
}

/// Drop every table this crate owns.
fn reset(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute_batch(
        r"
        DROP TABLE IF EXISTS queue_entries;
        DROP TABLE IF EXISTS sync_config;
        PRAGMA user_version = 0;
        ",
    )
    .map_err(|e| ScoutError::Database(format!("Failed to reset schema: {e}")))
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: i32) -> Result<(), ScoutError> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        3 => migrate_v3(conn),
        _ => Err(ScoutError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: Initial schema.
///
/// Creates tables for:
/// - `queue_entries`: offline scouting entry queue
/// - `sync_config`: single-row persisted sync configuration
fn migrate_v1(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS queue_entries (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            last_attempt TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            remote_id INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_queue_entries_status
        ON queue_entries(status);

        CREATE TABLE IF NOT EXISTS sync_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| ScoutError::Database(format!("Migration v1 failed: {e}")))
}

/// Migration v2: record when an entry reached `synced`, so retention is
/// measured from delivery rather than from enqueue.
fn migrate_v2(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute_batch(
        r"
        ALTER TABLE queue_entries ADD COLUMN synced_at TEXT;

        UPDATE queue_entries SET synced_at = COALESCE(last_attempt, created_at)
        WHERE status = 'synced';

        CREATE INDEX IF NOT EXISTS idx_queue_entries_created
        ON queue_entries(created_at);
        ",
    )
    .map_err(|e| ScoutError::Database(format!("Migration v2 failed: {e}")))
}

/// Migration v3: remember which queue handle holds a `syncing` entry and
/// since when, so a second process opening the queue leaves live claims alone.
///
/// Rows already `syncing` keep a NULL owner and are released on the next open.
fn migrate_v3(conn: &Connection) -> Result<(), ScoutError> {
    conn.execute_batch(
        r"
        ALTER TABLE queue_entries ADD COLUMN claimed_by TEXT;
        ALTER TABLE queue_entries ADD COLUMN claimed_at TEXT;
        ",
    )
    .map_err(|e| ScoutError::Database(format!("Migration v3 failed: {e}")))
}
