//! Sync queue command implementation.
//!
//! Handles sync queue management commands.

use colored::Colorize;
use serde_json::json;

use super::Context;
use crate::cli::args::{OutputFormat, SyncCommands};
use crate::error::ScoutError;
use crate::features::sync::{EntryStatus, SyncConfigUpdate};
use crate::output::{format_config_pretty, format_entries, format_status, format_sync_result, to_json};

/// Execute sync subcommands.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or written, or a sync pass
/// is refused because the API is unreachable.
pub async fn sync(ctx: &Context, cmd: SyncCommands) -> Result<String, ScoutError> {
    match cmd {
        SyncCommands::Status => {
            let (engine, _) = ctx.engine().await?;
            format_status(&engine.status()?, ctx.format)
        }
        SyncCommands::Run => {
            let (engine, _) = ctx.engine().await?;
            let result = engine.sync_pending_entries().await?;
            format_sync_result(&result, ctx.format)
        }
        SyncCommands::Retry => {
            let (engine, _) = ctx.engine().await?;
            let result = engine.retry_failed_entries().await?;
            format_sync_result(&result, ctx.format)
        }
        SyncCommands::List { status, limit } => list_entries(ctx, status.as_deref(), limit),
        SyncCommands::Clear => clear_synced(ctx),
        SyncCommands::Discard { id } => discard_entry(ctx, &id),
        SyncCommands::Config {
            max_retries,
            retry_delay_ms,
            batch_size,
            auto_sync,
        } => update_config(
            ctx,
            SyncConfigUpdate {
                max_retries,
                retry_delay_ms,
                batch_size,
                auto_sync_enabled: auto_sync.map(Into::into),
            },
        ),
    }
}

fn parse_status(s: &str) -> Result<EntryStatus, ScoutError> {
    match s.to_lowercase().as_str() {
        "pending" | "syncing" | "synced" | "error" | "failed" => Ok(EntryStatus::from_string(s)),
        other => Err(ScoutError::Config(format!(
            "Unknown status '{other}' (expected pending, syncing, synced or error)"
        ))),
    }
}

/// List queued entries.
fn list_entries(
    ctx: &Context,
    status_filter: Option<&str>,
    limit: usize,
) -> Result<String, ScoutError> {
    let status = status_filter.map(parse_status).transpose()?;
    let queue = ctx.open_queue()?;
    let entries = queue.list(status, limit)?;

    format_entries(&entries, queue.sync_config().max_retries, ctx.format)
}

/// Remove synced entries.
fn clear_synced(ctx: &Context) -> Result<String, ScoutError> {
    let queue = ctx.open_queue()?;
    let count = queue.clear_synced_entries()?;

    match ctx.format {
        OutputFormat::Json => to_json(&json!({ "cleared": count })),
        OutputFormat::Pretty => Ok(if count == 0 {
            "No synced entries to clear.".to_string()
        } else {
            format!("Cleared {count} synced entries.")
        }),
    }
}

/// Discard a single undelivered entry.
fn discard_entry(ctx: &Context, id: &str) -> Result<String, ScoutError> {
    let queue = ctx.open_queue()?;

    if !queue.delete(id)? {
        return match queue.get(id)? {
            None => Err(ScoutError::NotFound(format!("entry {id}"))),
            Some(entry) => Err(ScoutError::Config(format!(
                "entry {id} is {} and cannot be discarded",
                entry.status
            ))),
        };
    }

    match ctx.format {
        OutputFormat::Json => to_json(&json!({ "discarded": id })),
        OutputFormat::Pretty => Ok(format!("{} Discarded entry {id}", "✓".green())),
    }
}

/// Show or change the persisted sync configuration.
fn update_config(ctx: &Context, update: SyncConfigUpdate) -> Result<String, ScoutError> {
    let queue = ctx.open_queue()?;

    if !update.is_empty() {
        queue.set_sync_config(update.apply(queue.sync_config()))?;
    }
    let config = queue.sync_config();

    match ctx.format {
        OutputFormat::Json => to_json(&config),
        OutputFormat::Pretty => Ok(format_config_pretty(&config)),
    }
}
