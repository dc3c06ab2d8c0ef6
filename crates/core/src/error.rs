//! Error types for the cache host

use cachehost_storage::StorageError;

/// Errors that can occur while configuring the host
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration key {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Preference storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
