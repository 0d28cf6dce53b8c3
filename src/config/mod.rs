//! Configuration management for scout-sync.
//!
//! This module handles loading and saving configuration from `~/.scout-sync/`.

mod paths;
mod settings;

pub use paths::Paths;
pub use settings::{ApiConfig, ColorSetting, Config, GeneralConfig, LoggingConfig, SyncSettings};
