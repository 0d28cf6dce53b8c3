//! Pit and match entry commands.
//!
//! `add` only writes to the local queue. `update` talks to the server
//! directly because it edits a record the server already owns.

use std::io::Read;

use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::Context;
use crate::cli::args::{
    MatchAddArgs, MatchCommands, OutputFormat, PitAddArgs, PitCommands, UpdateArgs,
};
use crate::error::ScoutError;
use crate::features::sync::EntryId;
use crate::output::to_json;
use crate::remote::RemoteClient;
use crate::scouting::{EntryKind, MatchEntry, PitEntry, ScoutingRecord};

/// Execute pit subcommands.
///
/// # Errors
///
/// Returns an error if the entry is invalid, cannot be queued, or the
/// server rejects an update.
pub async fn pit(ctx: &Context, cmd: PitCommands) -> Result<String, ScoutError> {
    match cmd {
        PitCommands::Add(args) => {
            let entry = match &args.json {
                Some(source) => read_json::<PitEntry>(source)?,
                None => pit_from_args(args)?,
            };
            enqueue(ctx, &ScoutingRecord::from(entry))
        }
        PitCommands::Update(args) => update(ctx, EntryKind::Pit, &args).await,
    }
}

/// Execute match subcommands.
///
/// # Errors
///
/// Returns an error if the entry is invalid, cannot be queued, or the
/// server rejects an update.
pub async fn match_entry(ctx: &Context, cmd: MatchCommands) -> Result<String, ScoutError> {
    match cmd {
        MatchCommands::Add(args) => {
            let entry = match &args.json {
                Some(source) => read_json::<MatchEntry>(source)?,
                None => match_from_args(args)?,
            };
            enqueue(ctx, &ScoutingRecord::from(entry))
        }
        MatchCommands::Update(args) => update(ctx, EntryKind::Match, &args).await,
    }
}

fn pit_from_args(args: PitAddArgs) -> Result<PitEntry, ScoutError> {
    let (Some(event), Some(team)) = (args.event, args.team) else {
        return Err(ScoutError::Config(
            "--event and --team are required without --json".to_string(),
        ));
    };

    let mut entry = PitEntry::new(event, team);
    entry.scout_name = args.scout;
    entry.drivetrain = args.drivetrain;
    entry.weight_lbs = args.weight;
    entry.width_in = args.width;
    entry.length_in = args.length;
    entry.mechanisms = args.mechanisms;
    entry.notes = args.notes.unwrap_or_default();
    Ok(entry)
}

fn match_from_args(args: MatchAddArgs) -> Result<MatchEntry, ScoutError> {
    let (Some(event), Some(match_number), Some(team)) =
        (args.event, args.match_number, args.team)
    else {
        return Err(ScoutError::Config(
            "--event, --match and --team are required without --json".to_string(),
        ));
    };

    let mut entry = MatchEntry::new(event, match_number, team);
    entry.alliance = args.alliance.map(Into::into);
    entry.scout_name = args.scout;
    entry.auto_points = args.auto_points;
    entry.teleop_points = args.teleop_points;
    entry.endgame = args.endgame;
    entry.fouls = args.fouls;
    entry.notes = args.notes.unwrap_or_default();
    Ok(entry)
}

/// Read a JSON document from a file, or from stdin when `source` is `-`.
fn read_json<T: DeserializeOwned>(source: &str) -> Result<T, ScoutError> {
    let contents = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).map_err(|e| {
            ScoutError::Config(format!("Failed to read {source}: {e}"))
        })?
    };
    Ok(serde_json::from_str(&contents)?)
}

fn enqueue(ctx: &Context, record: &ScoutingRecord) -> Result<String, ScoutError> {
    let queue = ctx.open_queue()?;
    let id = queue.enqueue(record)?;
    let pending = queue.pending_count()?;

    format_queued(record, &id, pending, ctx.format)
}

fn format_queued(
    record: &ScoutingRecord,
    id: &EntryId,
    pending: usize,
    format: OutputFormat,
) -> Result<String, ScoutError> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "id": id,
            "kind": record.kind(),
            "teamNumber": record.team_number(),
            "pending": pending,
        })),
        OutputFormat::Pretty => Ok(format!(
            "{} Queued {} entry for team {} {}\n  {} entries waiting to sync",
            "✓".green(),
            record.kind(),
            record.team_number(),
            format!("({id})").dimmed(),
            pending
        )),
    }
}

async fn update(ctx: &Context, kind: EntryKind, args: &UpdateArgs) -> Result<String, ScoutError> {
    let changes: Value = serde_json::from_str(&args.changes)?;
    if !changes.is_object() {
        return Err(ScoutError::Config(
            "--changes must be a JSON object".to_string(),
        ));
    }

    let client = ctx.remote()?;
    match kind {
        EntryKind::Pit => client.update_pit_entry(args.remote_id, &changes).await?,
        EntryKind::Match => client.update_match_entry(args.remote_id, &changes).await?,
    }

    match ctx.format {
        OutputFormat::Json => to_json(&json!({
            "id": args.remote_id,
            "kind": kind,
            "updated": true,
        })),
        OutputFormat::Pretty => Ok(format!(
            "{} Updated {kind} entry #{}",
            "✓".green(),
            args.remote_id
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::AllianceArg;
    use crate::scouting::Alliance;

    fn match_args() -> MatchAddArgs {
        MatchAddArgs {
            event: Some("2026casj".to_string()),
            match_number: Some(12),
            team: Some(971),
            alliance: Some(AllianceArg::Blue),
            scout: None,
            auto_points: 15,
            teleop_points: 40,
            endgame: Some("deep".to_string()),
            fouls: 1,
            notes: None,
            json: None,
        }
    }

    #[test]
    fn test_match_from_args() {
        let entry = match_from_args(match_args()).unwrap();
        assert_eq!(entry.match_number, 12);
        assert_eq!(entry.alliance, Some(Alliance::Blue));
        assert_eq!(entry.auto_points, 15);
        assert_eq!(entry.endgame.as_deref(), Some("deep"));
    }

    #[test]
    fn test_match_from_args_missing_team() {
        let mut args = match_args();
        args.team = None;
        assert!(matches!(
            match_from_args(args),
            Err(ScoutError::Config(_))
        ));
    }

    #[test]
    fn test_read_json_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("pit.json");
        std::fs::write(
            &path,
            r#"{"eventKey": "2026casj", "teamNumber": 254, "climbLevel": 3}"#,
        )
        .unwrap();

        let entry: PitEntry = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(entry.team_number, 254);
        assert_eq!(entry.extra.get("climbLevel"), Some(&json!(3)));
    }

    #[test]
    fn test_format_queued_json() {
        let record = ScoutingRecord::from(PitEntry::new("2026casj", 254));
        let output =
            format_queued(&record, &"abc".to_string(), 2, OutputFormat::Json).unwrap();
        assert!(output.contains("\"kind\": \"pit\""));
        assert!(output.contains("\"pending\": 2"));
    }
}
