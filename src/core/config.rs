//! Progression configuration
//!
//! Rank tables for both currencies and where blessing definitions live.
//! Loaded from a TOML file; every field has a default so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::{LoadError, ProgressionError};
use crate::progression::rank::{RankProgressionTracker, RankTable};

/// Configuration for the progression engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// File or directory of blessing TOML definitions
    pub catalog_path: PathBuf,

    /// Player ranks, keyed on lifetime favor
    pub favor_ranks: RankTable,

    /// Religion ranks, keyed on lifetime prestige
    pub prestige_ranks: RankTable,

    /// Largest single currency award accepted by the authority.
    ///
    /// Guards against a runaway caller pushing a total to u64::MAX in one call;
    /// 0 disables the cap.
    pub max_award: u64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/blessings"),
            favor_ranks: RankTable::favor_defaults(),
            prestige_ranks: RankTable::prestige_defaults(),
            max_award: 100_000,
        }
    }
}

impl ProgressionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ProgressionError> {
        let config: Self = toml::from_str(content).map_err(|source| LoadError::Toml {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self, ProgressionError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| LoadError::Toml {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ProgressionError> {
        // Rank tables are validated on construction; only cross-field checks here
        if self.catalog_path.as_os_str().is_empty() {
            return Err(ProgressionError::Config("catalog_path is empty".into()));
        }
        Ok(())
    }

    /// Build the rank tracker described by this config
    pub fn tracker(&self) -> RankProgressionTracker {
        RankProgressionTracker::new(self.favor_ranks.clone(), self.prestige_ranks.clone())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<ProgressionConfig> = OnceLock::new();

/// Get the global progression config (initializes with defaults if not set)
pub fn config() -> &'static ProgressionConfig {
    CONFIG.get_or_init(ProgressionConfig::default)
}

/// Set the global progression config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: ProgressionConfig) -> Result<(), ProgressionConfig> {
    CONFIG.set(config)
}
