//! JSON output formatting for scout-sync.

use serde::Serialize;
use serde_json::json;

use crate::error::ScoutError;
use crate::features::sync::{QueuedEntry, SyncResult};

/// Format a sync result as JSON
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn format_sync_result_json(result: &SyncResult) -> Result<String, ScoutError> {
    let output = json!({
        "synced": result.synced,
        "failed": result.failed,
        "skipped": result.skipped,
        "unrecorded": result.unrecorded,
        "total": result.total(),
        "errors": result.errors,
        "outcomes": result.outcomes,
        "timestamp": result.timestamp,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format queued entries as JSON, payloads decoded
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn format_entries_json(entries: &[QueuedEntry]) -> Result<String, ScoutError> {
    let items: Vec<_> = entries.iter().map(entry_value).collect();
    let output = json!({
        "count": entries.len(),
        "items": items
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn entry_value(entry: &QueuedEntry) -> serde_json::Value {
    // A corrupt payload is shown as the raw text rather than hidden.
    let payload = serde_json::from_str::<serde_json::Value>(&entry.payload)
        .unwrap_or_else(|_| serde_json::Value::String(entry.payload.clone()));
    json!({
        "id": entry.id,
        "kind": entry.kind,
        "status": entry.status,
        "createdAt": entry.created_at,
        "lastAttempt": entry.last_attempt,
        "attempts": entry.attempts,
        "lastError": entry.last_error,
        "remoteId": entry.remote_id,
        "syncedAt": entry.synced_at,
        "payload": payload,
    })
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ScoutError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sync::{EntryOutcome, Outcome};
    use crate::scouting::{EntryKind, PitEntry, ScoutingRecord};

    #[test]
    fn test_format_sync_result_json() {
        let mut result = SyncResult::empty();
        result.add(EntryOutcome {
            id: "a".to_string(),
            kind: EntryKind::Pit,
            outcome: Outcome::Synced { remote_id: 42 },
        });
        result.add(EntryOutcome {
            id: "b".to_string(),
            kind: EntryKind::Match,
            outcome: Outcome::Failed {
                message: "request timed out".to_string(),
            },
        });

        let output = format_sync_result_json(&result).unwrap();
        assert!(output.contains("\"synced\": 1"));
        assert!(output.contains("\"failed\": 1"));
        assert!(output.contains("\"remote_id\": 42"));
        assert!(output.contains("\"outcome\": \"failed\""));
        assert!(output.contains("match entry b: request timed out"));
    }

    #[test]
    fn test_format_entries_json_decodes_payload() {
        let entry = QueuedEntry::new(&ScoutingRecord::from(PitEntry::new("2026casj", 254))).unwrap();

        let output = format_entries_json(&[entry]).unwrap();
        assert!(output.contains("\"count\": 1"));
        assert!(output.contains("\"status\": \"pending\""));
        assert!(output.contains("\"teamNumber\": 254"));
    }

    #[test]
    fn test_format_entries_json_corrupt_payload() {
        let mut entry =
            QueuedEntry::new(&ScoutingRecord::from(PitEntry::new("2026casj", 254))).unwrap();
        entry.payload = "{oops".to_string();

        let output = format_entries_json(&[entry]).unwrap();
        assert!(output.contains("\"payload\": \"{oops\""));
    }

    #[test]
    fn test_to_json_generic() {
        let data = vec!["a", "b"];
        let output = to_json(&data).unwrap();
        assert!(output.contains("\"a\""));
    }
}
