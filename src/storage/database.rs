//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.scout-sync/scout-sync.db` and contains:
//! - `queue_entries`: queued scouting records and their delivery status
//! - `sync_config`: the persisted sync configuration record

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;

use crate::config::Paths;
use crate::error::ScoutError;

use super::migrations;

/// Database connection wrapper.
///
/// The connection sits behind a mutex so the queue can be shared between the
/// sync orchestrator, the auto-sync task and UI callers. Guards must never be
/// held across an `.await`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database under the given data root.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open(paths: &Paths) -> Result<Self, ScoutError> {
        paths.ensure_dirs()?;
        Self::open_at(&paths.database)
    }

    /// Open the database at a specific path.
    ///
    /// Creates the database file and runs migrations if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &std::path::Path) -> Result<Self, ScoutError> {
        let conn = Connection::open(path).map_err(|e| {
            ScoutError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;

        // WAL keeps readers (count polling) from blocking the writer.
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(|e| ScoutError::Database(format!("Failed to configure journal: {e}")))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, ScoutError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ScoutError::Database(format!("Failed to open in-memory database: {e}"))
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ScoutError> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, ScoutError> {
        migrations::get_version(&self.conn.lock())
    }

    /// Lock and return the underlying connection.
    ///
    /// This is primarily for use by feature modules that need direct access.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}
