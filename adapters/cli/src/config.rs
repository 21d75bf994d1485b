//! `vortex.toml` loading.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use vortex_system_target_selection::{Config, RepeatPolicy};

/// Configuration file read when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "vortex.toml";

const DEFAULT_DATA_DIR: &str = ".vortex";
const SCORES_FILE: &str = "scores.json";
const PROGRESS_FILE: &str = "progress.json";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings for a `vortex` invocation. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct VortexConfig {
    /// Where scores and progress are kept.
    pub(crate) storage: StorageConfig,
    /// Target selection settings.
    pub(crate) round: RoundConfig,
    /// Diagnostic output settings.
    pub(crate) logging: LoggingConfig,
}

/// `[storage]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct StorageConfig {
    /// Directory holding the score table and the progress file.
    pub(crate) data_dir: PathBuf,
}

impl StorageConfig {
    /// Location of the durable score table.
    #[must_use]
    pub(crate) fn scores_path(&self) -> PathBuf {
        self.data_dir.join(SCORES_FILE)
    }

    /// Location of the durable progress preferences.
    #[must_use]
    pub(crate) fn progress_path(&self) -> PathBuf {
        self.data_dir.join(PROGRESS_FILE)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

/// `[round]` table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct RoundConfig {
    /// Fixed seed for target selection; entropy when absent.
    pub(crate) seed: Option<u64>,
    /// Never highlight the same cell twice in a row.
    pub(crate) avoid_repeat: bool,
}

impl RoundConfig {
    /// Selector configuration, optionally overriding the seed.
    #[must_use]
    pub(crate) fn selector_config(&self, seed_override: Option<u64>) -> Config {
        let policy = if self.avoid_repeat {
            RepeatPolicy::Avoid
        } else {
            RepeatPolicy::Allow
        };
        Config::new(policy, seed_override.or(self.seed))
    }
}

/// `[logging]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub(crate) filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

/// Reads the configuration at `path`, falling back to defaults when the file
/// does not exist.
pub(crate) fn load(path: &Path) -> Result<VortexConfig> {
    match fs::read_to_string(path) {
        Ok(raw) => parse(&raw).with_context(|| format!("invalid configuration in {}", path.display())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(VortexConfig::default()),
        Err(error) => Err(error).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Parses configuration text.
pub(crate) fn parse(raw: &str) -> Result<VortexConfig> {
    toml::from_str(raw).context("failed to parse configuration")
}
