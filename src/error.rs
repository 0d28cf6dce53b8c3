//! Error types for scout-sync.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors surfaced to callers of the queue and sync engine.
///
/// Transport and remote rejection failures that happen while a sync pass is
/// delivering queued entries never show up here: they are recorded on the
/// entry and aggregated into the pass's `SyncResult`.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Durable store failure (open, read, write, migrate).
    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid configuration or invalid user input.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sync pass was requested while the network monitor reports offline.
    #[error("Cannot sync while offline")]
    Offline,

    /// A sync pass was requested while another pass is running.
    #[error("A sync pass is already in progress")]
    SyncInProgress,

    /// A direct (non-queued) remote call failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl ScoutError {
    /// Whether this error is one of the invariant violations a UI should
    /// report as "try again later" rather than as a failure.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Offline | Self::SyncInProgress)
    }
}

impl From<rusqlite::Error> for ScoutError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_yaml::Error> for ScoutError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}
