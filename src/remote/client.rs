//! Remote scouting API seam: error classification and the client trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::scouting::{MatchEntry, PitEntry, ScoutingRecord};

/// Identifier assigned by the server when a record is created.
pub type RemoteId = i64;

/// Structured failure of a single remote call.
///
/// The `Display` text is what ends up in a queued entry's `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network unreachable: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("rejected by server (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Classify a non-2xx response.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            _ => {
                let message = body.trim();
                Self::Rejected {
                    status,
                    message: if message.is_empty() {
                        "no response body".to_string()
                    } else {
                        message.chars().take(200).collect()
                    },
                }
            }
        }
    }
}

/// The scouting API's record endpoints.
///
/// Callers guarantee at most one in-flight call per queued entry; the
/// implementation does not deduplicate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn create_pit_entry(&self, entry: &PitEntry) -> Result<RemoteId, RemoteError>;

    async fn create_match_entry(&self, entry: &MatchEntry) -> Result<RemoteId, RemoteError>;

    async fn update_pit_entry(&self, id: RemoteId, changes: &Value) -> Result<(), RemoteError>;

    async fn update_match_entry(&self, id: RemoteId, changes: &Value)
        -> Result<(), RemoteError>;
}

/// Create `record` through the endpoint matching its kind.
///
/// # Errors
///
/// Returns whatever the underlying create call returns.
pub async fn submit(
    client: &dyn RemoteClient,
    record: &ScoutingRecord,
) -> Result<RemoteId, RemoteError> {
    match record {
        ScoutingRecord::Pit(entry) => client.create_pit_entry(entry).await,
        ScoutingRecord::Match(entry) => client.create_match_entry(entry).await,
    }
}
