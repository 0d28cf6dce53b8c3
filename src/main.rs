use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use scout_sync::cli::args::{Cli, Commands};
use scout_sync::cli::commands::{self, Context};
use scout_sync::error::ScoutError;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ScoutError> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "scout-sync",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let ctx = Context::load(cli.home.as_deref(), cli.output)?;
    setup_logging(&ctx, matches!(cli.command, Commands::Watch));

    let output = match cli.command {
        Commands::Pit(args) => commands::pit(&ctx, args.command).await?,
        Commands::Match(args) => commands::match_entry(&ctx, args.command).await?,
        Commands::Sync(args) => commands::sync(&ctx, args.command).await?,
        Commands::Watch => commands::watch(&ctx).await?,
        Commands::Completions { .. } => String::new(),
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// `SCOUT_SYNC_LOG` wins over the configured level. Watch mode logs to a file
/// so log lines do not interleave with sync reports.
fn setup_logging(ctx: &Context, to_file: bool) {
    let filter = EnvFilter::try_from_env("SCOUT_SYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&ctx.config.logging.level));

    if to_file {
        let file = ctx.paths.ensure_dirs().ok().and_then(|()| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(ctx.paths.log_file())
                .ok()
        });
        if let Some(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
