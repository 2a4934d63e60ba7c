//! Pipeline configuration
//!
//! TOML file supplying the collaborator parameters: which host to poll, how
//! far back to look, and where the data roots live. The remote command
//! timeout has no default on purpose; a hung remote command would otherwise
//! block the whole run indefinitely.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub systemd: SystemdConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteConfig {
    pub host: String,
    pub user: String,
    /// Private key path; omit to use the ssh client's default discovery
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// Per-command execution deadline. Required, no default.
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SystemdConfig {
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_since_hours")]
    pub since_hours: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DockerConfig {
    #[serde(default = "default_since_minutes")]
    pub since_minutes: i64,
    /// Explicit container ids/names to collect; omit to collect all running
    #[serde(default)]
    pub containers: Option<Vec<String>>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_ingested_root")]
    pub ingested_root: PathBuf,
    #[serde(default = "default_processed_root")]
    pub processed_root: PathBuf,
}

fn default_unit() -> String {
    "docker.service".to_string()
}

fn default_since_hours() -> u64 {
    24
}

fn default_since_minutes() -> i64 {
    60
}

fn default_concurrency() -> usize {
    4
}

fn default_ingested_root() -> PathBuf {
    PathBuf::from("data/ingested")
}

fn default_processed_root() -> PathBuf {
    PathBuf::from("data/processed")
}

impl Default for SystemdConfig {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            since_hours: default_since_hours(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            since_minutes: default_since_minutes(),
            containers: None,
            concurrency: default_concurrency(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ingested_root: default_ingested_root(),
            processed_root: default_processed_root(),
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {e}", path.display())))?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.host must not be empty".to_string(),
            ));
        }
        if self.remote.user.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.user must not be empty".to_string(),
            ));
        }
        if self.remote.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "remote.command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.docker.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "docker.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
