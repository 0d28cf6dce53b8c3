//! Command implementations for scout-sync.
//!
//! This module contains the implementation of all CLI commands.

mod record;
mod sync;
mod watch;

pub use record::{match_entry, pit};
pub use sync::sync;
pub use watch::watch;

use std::path::Path;
use std::sync::Arc;

use crate::cli::args::OutputFormat;
use crate::config::{ColorSetting, Config, Paths};
use crate::error::ScoutError;
use crate::features::sync::{ConnectivityProbe, NetworkMonitor, QueueManager, ScoutSync};
use crate::remote::HttpRemoteClient;
use crate::storage::Database;

/// Everything a command needs before it touches the queue.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    /// Resolve the data directory and load its configuration.
    ///
    /// `output` overrides the configured default output format.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// config file cannot be parsed.
    pub fn load(home: Option<&Path>, output: Option<OutputFormat>) -> Result<Self, ScoutError> {
        let paths = Paths::resolve(home)?;
        let config = Config::load(&paths)?;

        match config.general.color {
            ColorSetting::Always => colored::control::set_override(true),
            ColorSetting::Never => colored::control::set_override(false),
            ColorSetting::Auto => {}
        }

        Ok(Self {
            format: output.unwrap_or(config.general.default_output),
            paths,
            config,
        })
    }

    /// HTTP client for the configured scouting API.
    ///
    /// # Errors
    ///
    /// Returns an error if the API settings are invalid.
    pub fn remote(&self) -> Result<Arc<HttpRemoteClient>, ScoutError> {
        Ok(Arc::new(HttpRemoteClient::new(
            &self.config.api.http_client_config(),
        )?))
    }

    /// Open the queue without an engine, for commands that never deliver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_queue(&self) -> Result<QueueManager, ScoutError> {
        QueueManager::open_with_lease(
            Database::open(&self.paths)?,
            self.config.sync.seed_config(),
            self.config.api.claim_lease(),
        )
    }

    /// Open the queue and build an engine whose network monitor starts out
    /// with a single reachability probe against the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the API settings
    /// are invalid.
    pub async fn engine(&self) -> Result<(Arc<ScoutSync>, Arc<NetworkMonitor>), ScoutError> {
        let remote = self.remote()?;
        let online = remote.is_reachable().await;
        tracing::debug!(online, "initial connectivity probe");

        let network = Arc::new(NetworkMonitor::new(online));
        let mut options = self.config.sync.engine_options();
        options.claim_lease = self.config.api.claim_lease();
        let engine = ScoutSync::new(
            Database::open(&self.paths)?,
            self.config.sync.seed_config(),
            remote,
            Arc::clone(&network),
            options,
        )?;
        Ok((Arc::new(engine), network))
    }
}
