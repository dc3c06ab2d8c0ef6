//! Host configuration
//!
//! Settings come from three layers, later ones overriding earlier ones:
//! built-in defaults (with the cache limit derived from physical memory), the
//! persisted `memory_cache_size` preference, and environment variables.

use cachehost_cache::default_size_limit;
use cachehost_scheduler::DEFAULT_DEBOUNCE_DELAY;
use cachehost_storage::{PreferenceStore, Preferences};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::registry::DEFAULT_INACTIVE_THRESHOLD;

/// Overrides the global limit, in megabytes
pub const ENV_MEMORY_CACHE_MB: &str = "CACHEHOST_MEMORY_CACHE_MB";
/// Overrides the inactivity threshold, in seconds
pub const ENV_INACTIVE_THRESHOLD_SECS: &str = "CACHEHOST_INACTIVE_THRESHOLD_SECS";
/// Overrides the recompute delay, in milliseconds
pub const ENV_RECOMPUTE_DELAY_MS: &str = "CACHEHOST_RECOMPUTE_DELAY_MS";

const MB: u64 = 1024 * 1024;

/// Configuration for [`CacheManagerHost`](crate::CacheManagerHost)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Bytes all renderer caches may use together
    pub global_size_limit: u64,
    /// Idle time after which an active renderer becomes inactive
    pub inactive_threshold: Duration,
    /// Delay between a registry change and the recompute it triggers
    pub recompute_delay: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::with_limit(default_size_limit())
    }
}

impl HostConfig {
    /// Creates a configuration with an explicit global limit in bytes.
    pub fn with_limit(global_size_limit: u64) -> Self {
        Self {
            global_size_limit,
            inactive_threshold: DEFAULT_INACTIVE_THRESHOLD,
            recompute_delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }

    /// Sets the global limit in megabytes.
    pub fn with_limit_mb(mut self, mb: u64) -> Self {
        self.global_size_limit = mb.saturating_mul(MB);
        self
    }

    /// Sets the inactivity threshold.
    pub fn with_inactive_threshold(mut self, threshold: Duration) -> Self {
        self.inactive_threshold = threshold;
        self
    }

    /// Sets the recompute delay.
    pub fn with_recompute_delay(mut self, delay: Duration) -> Self {
        self.recompute_delay = delay;
        self
    }

    /// Defaults with the global limit taken from `memory_cache_size` when set.
    pub fn from_preferences(preferences: &Preferences) -> Self {
        match preferences.memory_cache_size {
            Some(limit) => Self::with_limit(limit),
            None => Self::default(),
        }
    }

    /// Loads preferences from `store`, then applies environment overrides.
    ///
    /// # Errors
    /// Returns an error if the preference file is unreadable or an
    /// environment variable holds an invalid value.
    pub fn load(store: &PreferenceStore) -> ConfigResult<Self> {
        let preferences = store.load_preferences()?;
        Self::from_preferences(&preferences).apply_env()
    }

    /// Applies environment overrides on top of this configuration.
    ///
    /// Environment variables:
    /// - `CACHEHOST_MEMORY_CACHE_MB`: global limit in MB
    /// - `CACHEHOST_INACTIVE_THRESHOLD_SECS`: inactivity threshold in seconds
    /// - `CACHEHOST_RECOMPUTE_DELAY_MS`: recompute delay in milliseconds
    ///
    /// # Errors
    /// Returns an error if any environment variable is not an integer, or if
    /// the limit in MB does not fit in a `u64` byte count.
    pub fn apply_env(mut self) -> ConfigResult<Self> {
        if let Some(mb) = env_u64(ENV_MEMORY_CACHE_MB)? {
            let bytes = mb.checked_mul(MB).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_MEMORY_CACHE_MB.to_string(),
                value: mb.to_string(),
            })?;
            self.global_size_limit = bytes;
        }

        if let Some(secs) = env_u64(ENV_INACTIVE_THRESHOLD_SECS)? {
            self.inactive_threshold = Duration::from_secs(secs);
        }

        if let Some(ms) = env_u64(ENV_RECOMPUTE_DELAY_MS)? {
            self.recompute_delay = Duration::from_millis(ms);
        }

        Ok(self)
    }

    /// Returns the global limit in megabytes.
    pub fn global_size_limit_mb(&self) -> u64 {
        self.global_size_limit / MB
    }
}

fn env_u64(key: &str) -> ConfigResult<Option<u64>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };

    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}
