//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::statistics::StatsConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the statistics log.
    pub data_dir: PathBuf,

    /// Tick interval of the `run` loop.
    pub update_interval_ms: u64,

    /// How often the current day is checkpointed while it changes.
    pub checkpoint_interval_secs: u64,

    pub idle_timeout_secs: u64,

    pub mouse_idle_reset_ms: u64,

    /// Rewrite the log at startup when it holds superseded blocks.
    pub compact_on_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs_data_path().unwrap_or_else(|| PathBuf::from(".")),
            update_interval_ms: 1000,
            checkpoint_interval_secs: 60,
            idle_timeout_secs: 10,
            mouse_idle_reset_ms: 1000,
            compact_on_load: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("stats.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (OWNMON_STATS_*)
        figment = figment.merge(Env::prefixed("OWNMON_STATS_"));

        figment.extract()
    }

    /// Engine settings derived from this configuration.
    pub fn stats(&self) -> StatsConfig {
        StatsConfig {
            data_dir: self.data_dir.clone(),
            checkpoint_interval: Duration::from_secs(self.checkpoint_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            mouse_idle_reset: Duration::from_millis(self.mouse_idle_reset_ms),
            compact_on_load: self.compact_on_load,
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}

/// Returns the platform-specific config directory.
///
/// On Linux: `~/.config/ownmon`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ownmon"))
}

/// Returns the platform-specific data directory.
///
/// On Linux: `~/.local/share/ownmon`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ownmon"))
}
