//! Output formatting for scout-sync.
//!
//! This module provides formatters for displaying queue state in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::ScoutError;
use crate::features::sync::{QueuedEntry, SyncResult, SyncStatus};

pub use json::*;
pub use pretty::*;

/// Format a sync pass result based on output format
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn format_sync_result(result: &SyncResult, format: OutputFormat) -> Result<String, ScoutError> {
    match format {
        OutputFormat::Pretty => Ok(format_sync_result_pretty(result)),
        OutputFormat::Json => format_sync_result_json(result),
    }
}

/// Format the engine status based on output format
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn format_status(status: &SyncStatus, format: OutputFormat) -> Result<String, ScoutError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(status)),
        OutputFormat::Json => to_json(status),
    }
}

/// Format queued entries based on output format
///
/// # Errors
///
/// Returns `ScoutError::Parse` if JSON serialization fails.
pub fn format_entries(
    entries: &[QueuedEntry],
    max_retries: u32,
    format: OutputFormat,
) -> Result<String, ScoutError> {
    match format {
        OutputFormat::Pretty => Ok(format_entries_pretty(entries, max_retries)),
        OutputFormat::Json => format_entries_json(entries),
    }
}
