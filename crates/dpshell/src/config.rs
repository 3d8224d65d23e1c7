//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use dpshell_core::ApplianceConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "DPSHELL_CONFIG";

/// Top-level configuration for dpshell
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Appliances used when none are given on the command line
    #[serde(default)]
    pub appliance: Vec<ApplianceConfig>,
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application domain to log into
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Seconds to wait for any single appliance response
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Command history file
    pub history_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            timeout_secs: default_timeout_secs(),
            history_file: None,
            log_level: None,
        }
    }
}

fn default_domain() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl SessionConfig {
    /// Response timeout as a duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// History file, defaulting to `~/.dpshell_history`
    #[must_use]
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".dpshell_history")))
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file: `DPSHELL_CONFIG`, then the working directory,
    /// then the user config directory
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let paths = [
            PathBuf::from("dpshell.toml"),
            dirs::config_dir()
                .map(|p| p.join("dpshell/dpshell.toml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|path| path.is_file())
    }
}
