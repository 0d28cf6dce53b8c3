//! Configuration settings for scout-sync.
//!
//! Settings are loaded from `~/.scout-sync/config.yaml`. The `sync` section
//! only seeds the persisted sync configuration the first time a database is
//! created; after that the copy in the database is authoritative.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::ScoutError;
use crate::features::sync::{EngineOptions, SyncConfig, DEFAULT_CLAIM_LEASE};
use crate::remote::HttpClientConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Remote API settings.
    pub api: ApiConfig,
    /// Sync engine settings.
    pub sync: SyncSettings,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Remote scouting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the scouting API, e.g. `https://scout.example.org`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seed for the persisted maximum attempts per entry.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seed for the persisted base backoff unit in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Seed for the persisted batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Seed for the persisted auto-sync flag.
    #[serde(default = "default_true")]
    pub auto_sync_enabled: bool,
    /// Delay between a reconnect and the auto-sync pass it triggers.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Interval between connectivity probes in `watch` mode.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    /// Synced entries older than this are pruned after each pass.
    #[serde(default = "default_retention_hours")]
    pub synced_retention_hours: u32,
    /// Upper bound on retained synced entries.
    #[serde(default = "default_max_synced")]
    pub max_synced_entries: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `SCOUT_SYNC_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions for serde
const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_connect_timeout() -> u64 {
    5
}

const fn default_request_timeout() -> u64 {
    15
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    5_000
}

const fn default_batch_size() -> usize {
    5
}

const fn default_true() -> bool {
    true
}

const fn default_settle_delay_ms() -> u64 {
    2_000
}

const fn default_probe_interval() -> u64 {
    15
}

const fn default_retention_hours() -> u32 {
    24
}

const fn default_max_synced() -> usize {
    500
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_size: default_batch_size(),
            auto_sync_enabled: default_true(),
            settle_delay_ms: default_settle_delay_ms(),
            probe_interval_secs: default_probe_interval(),
            synced_retention_hours: default_retention_hours(),
            max_synced_entries: default_max_synced(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    /// HTTP client settings derived from this section.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Lease on `syncing` claims: the default, or twice the longest single
    /// call if the configured timeouts are longer than that.
    #[must_use]
    pub fn claim_lease(&self) -> Duration {
        let longest_call = Duration::from_secs(
            self.connect_timeout_secs
                .saturating_add(self.request_timeout_secs)
                .saturating_mul(2),
        );
        DEFAULT_CLAIM_LEASE.max(longest_call)
    }
}

impl SyncSettings {
    /// Sync configuration used when the database has none stored yet.
    #[must_use]
    pub const fn seed_config(&self) -> SyncConfig {
        SyncConfig {
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            batch_size: self.batch_size,
            auto_sync_enabled: self.auto_sync_enabled,
        }
    }

    /// Engine options that are not part of the persisted sync configuration.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            synced_retention: chrono::Duration::hours(i64::from(self.synced_retention_hours)),
            max_synced_entries: self.max_synced_entries,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    /// Interval between connectivity probes.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

impl Config {
    /// Load configuration from the given paths.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load(paths: &Paths) -> Result<Self, ScoutError> {
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ScoutError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            ScoutError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.general.default_output, OutputFormat::Pretty);
        assert_eq!(config.general.color, ColorSetting::Auto);
        assert_eq!(config.api.request_timeout_secs, 15);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.batch_size, 5);
        assert!(config.sync.auto_sync_enabled);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.api.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let partial_yaml = r#"
sync:
  max_retries: 7
api:
  token: "abc"
"#;
        std::fs::write(&config_path, partial_yaml).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();

        assert_eq!(config.sync.max_retries, 7);
        assert_eq!(config.sync.retry_delay_ms, 5_000);
        assert_eq!(config.api.token.as_deref(), Some("abc"));
        assert_eq!(config.api.connect_timeout_secs, 5);
    }

    #[test]
    fn test_seed_config_and_engine_options() {
        let settings = SyncSettings {
            batch_size: 9,
            settle_delay_ms: 250,
            synced_retention_hours: 6,
            ..SyncSettings::default()
        };

        let seed = settings.seed_config();
        assert_eq!(seed.batch_size, 9);
        assert_eq!(seed.max_retries, 3);

        let options = settings.engine_options();
        assert_eq!(options.settle_delay, Duration::from_millis(250));
        assert_eq!(options.synced_retention, chrono::Duration::hours(6));
    }

    #[test]
    fn test_claim_lease_outlasts_timeouts() {
        let mut api = ApiConfig::default();
        assert_eq!(api.claim_lease(), DEFAULT_CLAIM_LEASE);

        api.request_timeout_secs = 300;
        assert_eq!(api.claim_lease(), Duration::from_secs(610));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "sync: [not, a, map]").unwrap();

        let err = Config::load_from_path(&config_path).unwrap_err();
        assert!(matches!(err, ScoutError::Config(_)));
    }
}
