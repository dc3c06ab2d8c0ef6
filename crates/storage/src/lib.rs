//! Persisted preferences for the cache host.
//!
//! Preferences live in `preferences.json` under a root directory, wrapped in a
//! versioned envelope. A missing file means "all defaults".

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PREFS_SCHEMA_VERSION: u32 = 1;
const PREFS_FILE_NAME: &str = "preferences.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local config directory")]
    NoConfigDirectory,
    #[error("unsupported preferences version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Host preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Global object cache budget in bytes; `None` derives it from physical memory
    pub memory_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesEnvelope {
    version: u32,
    preferences: Preferences,
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    root: PathBuf,
}

impl PreferenceStore {
    pub fn from_default_location() -> Result<Self, StorageError> {
        let config_dir = dirs::config_dir().ok_or(StorageError::NoConfigDirectory)?;

        Ok(Self { root: config_dir.join("cachehost") })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join(PREFS_FILE_NAME)
    }

    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let bytes = fs::read(path)?;
        let envelope: PreferencesEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion { found: envelope.version });
        }

        Ok(envelope.preferences)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = PreferencesEnvelope {
            version: PREFS_SCHEMA_VERSION,
            preferences: preferences.clone(),
        };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.preferences_path(), bytes)?;
        Ok(())
    }
}
