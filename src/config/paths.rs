//! Path resolution for scout-sync configuration and data files.
//!
//! All scout-sync data is stored in `~/.scout-sync/` unless overridden with
//! `--home` or `SCOUT_SYNC_HOME`:
//! - `config.yaml` - Main configuration file
//! - `scout-sync.db` - SQLite database holding the queue and sync config
//! - `logs/` - Log files written by `scout-sync watch`

use std::path::{Path, PathBuf};

use crate::error::ScoutError;

/// Paths to scout-sync configuration and data directories.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.scout-sync/`
    pub root: PathBuf,
    /// Config file: `~/.scout-sync/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.scout-sync/scout-sync.db`
    pub database: PathBuf,
    /// Logs directory: `~/.scout-sync/logs/`
    pub logs: PathBuf,
}

impl Paths {
    /// Create paths based on the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, ScoutError> {
        let home = std::env::var("HOME")
            .map_err(|_| ScoutError::Config("Could not determine home directory".to_string()))?;

        Ok(Self::with_root(PathBuf::from(home).join(".scout-sync")))
    }

    /// Resolve paths from an explicit root if one was given, else from `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if no root was given and the home directory cannot be
    /// determined.
    pub fn resolve(root: Option<&Path>) -> Result<Self, ScoutError> {
        root.map_or_else(Self::new, |r| Ok(Self::with_root(r.to_path_buf())))
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("scout-sync.db"),
            logs: root.join("logs"),
            root,
        }
    }

    /// Log file used by long-running commands.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.logs.join("scout-sync.log")
    }

    /// Ensure all directories exist, creating them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), ScoutError> {
        for dir in [&self.root, &self.logs] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ScoutError::Config(format!(
                        "Failed to create directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }

        Ok(())
    }
}
