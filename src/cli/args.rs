use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::remote::RemoteId;
use crate::scouting::Alliance;

#[derive(Parser)]
#[command(name = "scout-sync")]
#[command(about = "Offline-first scouting queue and sync engine")]
#[command(long_about = "scout-sync - offline-first scouting data capture

Records pit and match scouting entries into a durable local queue and
delivers them to the scouting API whenever the venue network allows.
Nothing is ever lost to a dropped connection: entries wait in the queue
until the server has acknowledged them.

QUICK START:
  scout-sync pit add --event 2026casj --team 254 --drivetrain swerve
  scout-sync match add --event 2026casj --match 12 --team 971 --auto 15
  scout-sync sync status        Show queued, synced and failed counts
  scout-sync sync run           Deliver everything that is waiting
  scout-sync watch              Stay running and sync on reconnect

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  scout-sync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Data directory (defaults to ~/.scout-sync)
    #[arg(long, global = true, env = "SCOUT_SYNC_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pit scouting entries
    ///
    /// Pit entries describe a team's robot and are recorded once per team
    /// per event.
    ///
    /// # Examples
    ///
    ///   scout-sync pit add --event 2026casj --team 254 --weight 118.5
    ///   scout-sync pit add --json pit.json
    ///   scout-sync pit update 88 --changes '{"notes": "new intake"}'
    Pit(PitArgs),

    /// Match scouting entries
    ///
    /// Match entries record one robot's performance in one match.
    ///
    /// # Examples
    ///
    ///   scout-sync match add --event 2026casj --match 12 --team 971 --alliance red
    ///   cat entry.json | scout-sync match add --json -
    #[command(name = "match", alias = "m")]
    Match(MatchArgs),

    /// Manage the sync queue
    ///
    /// Inspect queued entries, deliver them, retry failures and tune the
    /// sync configuration.
    ///
    /// # Examples
    ///
    ///   scout-sync sync status
    ///   scout-sync sync run
    ///   scout-sync sync list --status error
    ///   scout-sync sync config --batch-size 2 --auto-sync off
    #[command(alias = "s")]
    Sync(SyncArgs),

    /// Stay running and sync automatically
    ///
    /// Probes the scouting API periodically. When it becomes reachable after
    /// being offline, waits for the connection to settle and then delivers
    /// queued entries. Failed passes are retried with exponential backoff.
    /// Stop with Ctrl-C.
    Watch,

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   scout-sync completions zsh > ~/.zfunc/_scout-sync
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct PitArgs {
    #[command(subcommand)]
    pub command: PitCommands,
}

#[derive(Subcommand)]
pub enum PitCommands {
    /// Queue a pit scouting entry
    Add(PitAddArgs),

    /// Update a pit entry already on the server (requires network)
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct PitAddArgs {
    /// Event key, e.g. 2026casj
    #[arg(long, env = "SCOUT_SYNC_EVENT", required_unless_present = "json")]
    pub event: Option<String>,

    /// Team number
    #[arg(long, short = 't', required_unless_present = "json")]
    pub team: Option<u32>,

    /// Scout name
    #[arg(long, env = "SCOUT_SYNC_SCOUT")]
    pub scout: Option<String>,

    /// Drivetrain type (swerve, tank, mecanum, ...)
    #[arg(long)]
    pub drivetrain: Option<String>,

    /// Robot weight in pounds
    #[arg(long)]
    pub weight: Option<f64>,

    /// Frame width in inches
    #[arg(long)]
    pub width: Option<f64>,

    /// Frame length in inches
    #[arg(long)]
    pub length: Option<f64>,

    /// Mechanism (repeatable)
    #[arg(long = "mechanism", short = 'm')]
    pub mechanisms: Vec<String>,

    /// Free-form notes
    #[arg(long, short = 'n')]
    pub notes: Option<String>,

    /// Read the whole entry as JSON from a file, or '-' for stdin
    #[arg(long, conflicts_with_all = ["team", "drivetrain", "weight", "width", "length", "mechanisms"])]
    pub json: Option<String>,
}

#[derive(Args)]
pub struct MatchArgs {
    #[command(subcommand)]
    pub command: MatchCommands,
}

#[derive(Subcommand)]
pub enum MatchCommands {
    /// Queue a match scouting entry
    Add(MatchAddArgs),

    /// Update a match entry already on the server (requires network)
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct MatchAddArgs {
    /// Event key, e.g. 2026casj
    #[arg(long, env = "SCOUT_SYNC_EVENT", required_unless_present = "json")]
    pub event: Option<String>,

    /// Match number
    #[arg(long = "match", required_unless_present = "json")]
    pub match_number: Option<u32>,

    /// Team number
    #[arg(long, short = 't', required_unless_present = "json")]
    pub team: Option<u32>,

    /// Alliance color
    #[arg(long, value_enum)]
    pub alliance: Option<AllianceArg>,

    /// Scout name
    #[arg(long, env = "SCOUT_SYNC_SCOUT")]
    pub scout: Option<String>,

    /// Autonomous points
    #[arg(long = "auto", default_value = "0")]
    pub auto_points: u32,

    /// Teleop points
    #[arg(long = "teleop", default_value = "0")]
    pub teleop_points: u32,

    /// Endgame result (park, shallow, deep, ...)
    #[arg(long)]
    pub endgame: Option<String>,

    /// Fouls committed
    #[arg(long, default_value = "0")]
    pub fouls: u32,

    /// Free-form notes
    #[arg(long, short = 'n')]
    pub notes: Option<String>,

    /// Read the whole entry as JSON from a file, or '-' for stdin
    #[arg(long, conflicts_with_all = ["match_number", "team", "alliance", "endgame"])]
    pub json: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Server-assigned entry ID
    pub remote_id: RemoteId,

    /// JSON object with the fields to change
    #[arg(long, short = 'c')]
    pub changes: String,
}

/// Alliance color for CLI input.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllianceArg {
    Red,
    Blue,
}

impl From<AllianceArg> for Alliance {
    fn from(arg: AllianceArg) -> Self {
        match arg {
            AllianceArg::Red => Self::Red,
            AllianceArg::Blue => Self::Blue,
        }
    }
}

#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommands,
}

/// Sync queue subcommands.
#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show sync queue status
    ///
    /// Displays pending, synced and failed counts, connectivity and the
    /// current sync configuration.
    Status,

    /// Deliver queued entries now
    ///
    /// Checks that the scouting API is reachable, then submits every pending
    /// entry with retries left, oldest first.
    Run,

    /// Retry failed entries
    ///
    /// Resets the attempt count of every failed entry, including those that
    /// used up their retries, and submits them again.
    Retry,

    /// List queued entries
    List {
        /// Filter by status (pending, syncing, synced, error)
        #[arg(long, short = 's')]
        status: Option<String>,

        /// Maximum entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Remove synced entries from the local queue
    ///
    /// Pending and failed entries are never removed.
    Clear,

    /// Discard a single entry that has not been delivered
    Discard {
        /// Local entry ID
        id: String,
    },

    /// Show or change the sync configuration
    ///
    /// Without flags, prints the current configuration.
    Config {
        /// Attempts allowed per entry before it needs a manual retry
        #[arg(long)]
        max_retries: Option<u32>,

        /// Base backoff between automatic retry passes, in milliseconds
        #[arg(long)]
        retry_delay_ms: Option<u64>,

        /// Maximum concurrent submissions
        #[arg(long)]
        batch_size: Option<usize>,

        /// Sync automatically when the network returns
        #[arg(long, value_enum)]
        auto_sync: Option<Toggle>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}
