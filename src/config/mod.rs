//! TOML-based configuration.
//!
//! Example configuration:
//! ```toml
//! [sync]
//! full_sync = true
//! url_threshold = 0.95
//! cardinality_threshold = 40
//! avg_length_threshold = 50
//! json_sample_cap = 10000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sync::thresholds;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Sync engine tuning.
    pub sync: SyncSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Tunable knobs of the sync engine. Defaults match the documented
/// classifier thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Whether scheduled syncs sample data (full sync) or only
    /// reconcile metadata.
    pub full_sync: bool,

    /// URL fraction above which a textual field is marked `url`.
    pub url_threshold: f64,

    /// Distinct-count ceiling below which a field is marked `category`.
    pub cardinality_threshold: usize,

    /// Average length above which a field is dropped from previews.
    pub avg_length_threshold: u64,

    /// Maximum number of values sampled by the JSON classifier.
    pub json_sample_cap: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            full_sync: true,
            url_threshold: thresholds::URL_RATIO,
            cardinality_threshold: thresholds::LOW_CARDINALITY,
            avg_length_threshold: thresholds::AVG_LENGTH,
            json_sample_cap: thresholds::MAX_SYNC_LAZY_SEQ_RESULTS,
        }
    }
}
