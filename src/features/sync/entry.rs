//! Queued entry model.
//!
//! A [`QueuedEntry`] wraps one user submission from the moment it is written
//! to the local store until the server has acknowledged it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoutError;
use crate::remote::RemoteId;
use crate::scouting::{EntryKind, ScoutingRecord};

/// Locally generated entry identifier (UUID v4, never reused).
pub type EntryId = String;

/// Delivery status of a queued entry.
///
/// `pending → syncing → synced | error`, and `error → pending` on manual
/// retry. `syncing` never survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Waiting for a sync pass
    Pending,
    /// Submission in flight
    Syncing,
    /// Acknowledged by the server
    Synced,
    /// Last submission failed
    Error,
}

impl EntryStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }

    /// Convert from a stored or user-supplied string.
    ///
    /// Unknown values map to `Pending`: an entry whose state cannot be read
    /// is treated as not yet delivered.
    #[must_use]
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "syncing" => Self::Syncing,
            "synced" => Self::Synced,
            "error" | "failed" => Self::Error,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scouting record queued for delivery, with its delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEntry {
    /// Local identifier
    pub id: EntryId,
    /// Record kind, selects the remote endpoint
    pub kind: EntryKind,
    /// JSON record body, without any remote identifier
    pub payload: String,
    /// Current status
    pub status: EntryStatus,
    /// When the entry was queued
    pub created_at: DateTime<Utc>,
    /// Most recent submission attempt
    pub last_attempt: Option<DateTime<Utc>>,
    /// Number of submission attempts
    pub attempts: u32,
    /// Last failure, cleared on success
    pub last_error: Option<String>,
    /// Server-assigned identifier, set only once synced
    pub remote_id: Option<RemoteId>,
    /// When the entry reached `synced`
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueuedEntry {
    /// Create a new pending entry for `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid or cannot be serialized.
    pub fn new(record: &ScoutingRecord) -> Result<Self, ScoutError> {
        record.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            kind: record.kind(),
            payload: record.to_payload()?,
            status: EntryStatus::Pending,
            created_at: Utc::now(),
            last_attempt: None,
            attempts: 0,
            last_error: None,
            remote_id: None,
            synced_at: None,
        })
    }

    /// Decode the payload back into a record.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Parse` if the stored payload is corrupt.
    pub fn record(&self) -> Result<ScoutingRecord, ScoutError> {
        ScoutingRecord::from_payload(self.kind, &self.payload)
    }

    /// Whether the entry has used up its automatic retries and needs the user.
    #[must_use]
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.status == EntryStatus::Error && self.attempts >= max_retries
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC text so that lexical order equals chronological order.
#[must_use]
pub fn to_stored_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
#[must_use]
pub fn from_stored_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
