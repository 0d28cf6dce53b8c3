use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::features::sync::{EntryStatus, QueuedEntry, SyncConfig, SyncResult, SyncStatus};
use crate::scouting::ScoutingRecord;

/// Format a sync pass result for display.
#[must_use]
pub fn format_sync_result_pretty(result: &SyncResult) -> String {
    if result.total() == 0 {
        return "No pending entries to sync.".to_string();
    }

    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} entries", result.total()));
    lines.push("─".repeat(40));

    if result.synced > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} synced", result.synced).green()
        ));
    }

    if result.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed", result.failed).red()
        ));
    }

    if result.skipped > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} skipped", result.skipped).yellow()
        ));
    }

    if result.unrecorded > 0 {
        lines.push(format!(
            "  {} {}",
            "!".red(),
            format!("{} not recorded", result.unrecorded).red()
        ));
    }

    // Show first few errors
    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for err in result.errors.iter().take(3) {
            lines.push(format!("  - {err}"));
        }
        if result.errors.len() > 3 {
            lines.push(format!("  ... and {} more", result.errors.len() - 3).dimmed().to_string());
        }
    }

    lines.join("\n")
}

/// Format the engine status for display.
#[must_use]
pub fn format_status_pretty(status: &SyncStatus) -> String {
    let stats = &status.stats;
    let mut lines = Vec::new();

    lines.push("Sync Queue Status".bold().to_string());
    lines.push("─".repeat(40));

    let network = if status.connectivity.online {
        "online".green()
    } else {
        "offline".yellow()
    };
    lines.push(format!("  Network:    {network}"));
    if status.in_progress {
        lines.push(format!("  Sync:       {}", "in progress".cyan()));
    }

    lines.push(format!(
        "  Pending:    {} {}",
        stats.pending,
        if stats.pending > 0 {
            "entries waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));
    lines.push(format!("  Synced:     {} {}", stats.synced, "retained".dimmed()));
    lines.push(format!(
        "  Failed:     {} {}",
        stats.failed,
        if stats.exhausted > 0 {
            format!("({} need manual retry)", stats.exhausted).red()
        } else {
            "".normal()
        }
    ));
    lines.push(format!("  Total:      {}", stats.total));

    if let Some(oldest) = stats.oldest_pending {
        lines.push(format!("  Oldest:     {}", age(oldest).dimmed()));
    }

    if let Some(last) = &status.last_result {
        lines.push(format!(
            "  Last sync:  {} ({} synced, {} failed)",
            age(last.timestamp).dimmed(),
            last.synced,
            last.failed
        ));
    }

    lines.push(String::new());
    lines.push(format_config_pretty(&status.config));

    if stats.exhausted > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'scout-sync sync retry' to resubmit failed entries"
                .dimmed()
                .to_string(),
        );
    } else if stats.pending > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'scout-sync sync run' to deliver pending entries"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Format the sync configuration.
#[must_use]
pub fn format_config_pretty(config: &SyncConfig) -> String {
    let mut lines = Vec::new();
    lines.push("Sync Config".bold().to_string());
    lines.push("─".repeat(40));
    lines.push(format!("  Max retries:     {}", config.max_retries));
    lines.push(format!("  Retry delay:     {} ms", config.retry_delay_ms));
    lines.push(format!("  Batch size:      {}", config.batch_size));
    lines.push(format!(
        "  Auto-sync:       {}",
        if config.auto_sync_enabled { "on" } else { "off" }
    ));
    lines.join("\n")
}

/// Format queued entries as a table.
#[must_use]
pub fn format_entries_pretty(entries: &[QueuedEntry], max_retries: u32) -> String {
    if entries.is_empty() {
        return "No entries in queue.".to_string();
    }

    let mut lines = Vec::new();

    lines.push(format!("Queued Entries ({})", entries.len()));
    lines.push("─".repeat(72));
    lines.push(format!(
        "{:<10} {:<6} {:<22} {:<17} {}",
        "ID", "Kind", "Record", "Created", "Status"
    ));
    lines.push("─".repeat(72));

    for entry in entries {
        let status = match entry.status {
            EntryStatus::Pending => "⏳ pending".to_string(),
            EntryStatus::Syncing => "▶ syncing".cyan().to_string(),
            EntryStatus::Synced => format!(
                "✓ synced #{}",
                entry.remote_id.map(|id| id.to_string()).unwrap_or_default()
            )
            .green()
            .to_string(),
            EntryStatus::Error if entry.is_exhausted(max_retries) => {
                format!("✗ failed {}/{}", entry.attempts, max_retries)
                    .red()
                    .bold()
                    .to_string()
            }
            EntryStatus::Error => format!("! retrying {}/{}", entry.attempts, max_retries)
                .yellow()
                .to_string(),
        };

        lines.push(format!(
            "{:<10} {:<6} {:<22} {:<17} {}",
            short_id(&entry.id),
            entry.kind,
            describe(entry),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            status
        ));

        if entry.status == EntryStatus::Error {
            if let Some(err) = &entry.last_error {
                lines.push(format!("           {}", err.dimmed()));
            }
        }
    }

    lines.join("\n")
}

fn describe(entry: &QueuedEntry) -> String {
    match entry.record() {
        Ok(ScoutingRecord::Pit(pit)) => format!("{} team {}", pit.event_key, pit.team_number),
        Ok(ScoutingRecord::Match(m)) => {
            format!("{} Q{} team {}", m.event_key, m.match_number, m.team_number)
        }
        Err(_) => "(unreadable)".to_string(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn age(time: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(time);
    if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}
