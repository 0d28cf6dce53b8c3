//! Long-running watch mode: probe connectivity, auto-sync on reconnect.

use std::sync::Arc;

use colored::Colorize;

use super::Context;
use crate::cli::args::OutputFormat;
use crate::error::ScoutError;
use crate::features::sync::{poll_connectivity, spawn_auto_sync, ConnectivityProbe};
use crate::output::format_sync_result;

/// Run until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the queue cannot be opened or the signal handler
/// cannot be installed.
pub async fn watch(ctx: &Context) -> Result<String, ScoutError> {
    let (engine, network) = ctx.engine().await?;
    let format = ctx.format;

    let listener = engine.subscribe(move |result| {
        if result.total() == 0 {
            return;
        }
        match format_sync_result(result, format) {
            Ok(output) => println!("{output}"),
            Err(e) => tracing::error!(error = %e, "failed to format sync result"),
        }
    });

    let probe: Arc<dyn ConnectivityProbe> = ctx.remote()?;
    let poller = poll_connectivity(
        Arc::clone(&network),
        probe,
        ctx.config.sync.probe_interval(),
    );
    let auto_sync = spawn_auto_sync(Arc::clone(&engine));

    if format == OutputFormat::Pretty {
        println!(
            "Watching {} ({}, {} pending). Press Ctrl-C to stop.",
            ctx.config.api.base_url.bold(),
            if network.is_online() {
                "online".green()
            } else {
                "offline".yellow()
            },
            engine.pending_count()?
        );
    }

    let mut connectivity = network.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                break;
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = connectivity.borrow_and_update().online;
                if format == OutputFormat::Pretty {
                    let state = if online { "online".green() } else { "offline".yellow() };
                    println!("{} network {state}", "→".dimmed());
                }
            }
        }
    }

    poller.abort();
    auto_sync.abort();
    if let Err(e) = auto_sync.await {
        if !e.is_cancelled() {
            tracing::error!(error = %e, "auto-sync task failed");
        }
    }
    // A pass cut short leaves its batch marked syncing.
    engine.queue().recover_interrupted()?;
    engine.unsubscribe(listener);
    tracing::info!("watch stopped");

    let pending = engine.pending_count()?;
    match format {
        OutputFormat::Json => Ok(String::new()),
        OutputFormat::Pretty => Ok(format!("Stopped. {pending} entries still waiting to sync.")),
    }
}
