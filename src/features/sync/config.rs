//! Persisted sync configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScoutError;

/// Upper bound for the automatic retry backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Process-wide sync settings, stored in the local database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts allowed before an entry is left in `error` for the user
    pub max_retries: u32,
    /// Base backoff unit in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum concurrent submissions within one pass
    pub batch_size: usize,
    /// Sync automatically when connectivity returns
    pub auto_sync_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 5_000,
            batch_size: 5,
            auto_sync_enabled: true,
        }
    }
}

impl SyncConfig {
    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Config` naming the offending field.
    pub fn validate(&self) -> Result<(), ScoutError> {
        if self.max_retries == 0 {
            return Err(ScoutError::Config("max_retries must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ScoutError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Delay before the next automatic pass after `failing_passes`
    /// consecutive passes that recorded failures.
    ///
    /// Doubles per failing pass and is capped at [`MAX_BACKOFF`].
    #[must_use]
    pub fn backoff_delay(&self, failing_passes: u32) -> Duration {
        let exponent = failing_passes.saturating_sub(1).min(16);
        let delay = Duration::from_millis(self.retry_delay_ms).saturating_mul(1 << exponent);
        delay.min(MAX_BACKOFF)
    }
}

/// Partial update applied by `set_sync_config` callers such as the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncConfigUpdate {
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub auto_sync_enabled: Option<bool>,
}

impl SyncConfigUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max_retries.is_none()
            && self.retry_delay_ms.is_none()
            && self.batch_size.is_none()
            && self.auto_sync_enabled.is_none()
    }

    #[must_use]
    pub fn apply(&self, config: SyncConfig) -> SyncConfig {
        SyncConfig {
            max_retries: self.max_retries.unwrap_or(config.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(config.retry_delay_ms),
            batch_size: self.batch_size.unwrap_or(config.batch_size),
            auto_sync_enabled: self.auto_sync_enabled.unwrap_or(config.auto_sync_enabled),
        }
    }
}
