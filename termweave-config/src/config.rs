//! The `Config` struct, its YAML persistence, and path helpers.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write, defaults on first run)
//! - XDG-compliant path helpers (`config_path`, `config_dir`, `state_file_path`,
//!   `profiles_file_path`)
//! - Semantic validation (`validate`)

use crate::error::ConfigError;
use crate::types::LogLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform config root.
const APP_DIR: &str = "termweave";

/// Runtime configuration for the session multiplexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========================================================================
    // Channel
    // ========================================================================
    /// TCP address of the shared channel endpoint
    #[serde(default = "crate::defaults::server_addr")]
    pub server_addr: String,

    /// Handshake path sent in the CONNECT frame
    #[serde(default = "crate::defaults::base_path")]
    pub base_path: String,

    /// Seconds to wait for CONNECTED before failing the handshake
    #[serde(default = "crate::defaults::handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    // ========================================================================
    // Heartbeat
    // ========================================================================
    /// Seconds between pings for each monitored session
    #[serde(default = "crate::defaults::heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Seconds a ping may go unanswered before the liveness signal fires
    #[serde(default = "crate::defaults::heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,

    // ========================================================================
    // Sessions
    // ========================================================================
    /// Maximum commands retained per session (oldest evicted first)
    #[serde(default = "crate::defaults::command_history_limit")]
    pub command_history_limit: usize,

    /// TERM value requested for remote terminals
    #[serde(default = "crate::defaults::terminal_type")]
    pub terminal_type: String,

    /// Columns used when the caller does not know the terminal size
    #[serde(default = "crate::defaults::default_cols")]
    pub default_cols: u16,

    /// Rows used when the caller does not know the terminal size
    #[serde(default = "crate::defaults::default_rows")]
    pub default_rows: u16,

    // ========================================================================
    // Files
    // ========================================================================
    /// Override for the persisted layout/session snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// Override for the connection profile list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_file: Option<PathBuf>,

    // ========================================================================
    // Logging
    // ========================================================================
    /// Level written to the debug log file
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: crate::defaults::server_addr(),
            base_path: crate::defaults::base_path(),
            handshake_timeout_secs: crate::defaults::handshake_timeout_secs(),
            heartbeat_interval_secs: crate::defaults::heartbeat_interval_secs(),
            heartbeat_timeout_secs: crate::defaults::heartbeat_timeout_secs(),
            command_history_limit: crate::defaults::command_history_limit(),
            terminal_type: crate::defaults::terminal_type(),
            default_cols: crate::defaults::default_cols(),
            default_rows: crate::defaults::default_rows(),
            state_file: None,
            profiles_file: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it with defaults if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Config path: {:?}", path);

        if !path.exists() {
            log::info!("Config file not found, creating default at {:?}", path);
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                // A read-only config directory must not block startup
                log::warn!("Failed to write default config to {:?}: {:#}", path, e);
            }
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(&contents)
                .map_err(ConfigError::from)
                .with_context(|| format!("Failed to parse config file {:?}", path))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let yaml = serde_yaml_ng::to_string(self).context("Failed to serialize config")?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)
            .with_context(|| format!("Failed to write temp config {:?}", temp_path))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move config into place at {:?}", path))?;

        Ok(())
    }

    /// Reject values that would make the runtime misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_addr.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server_addr must not be empty".to_string(),
            ));
        }
        if !self.base_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "base_path must start with '/', got {:?}",
                self.base_path
            )));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "handshake_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "heartbeat_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "heartbeat_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_timeout_secs >= self.heartbeat_interval_secs {
            return Err(ConfigError::Validation(format!(
                "heartbeat_timeout_secs ({}) must be less than heartbeat_interval_secs ({})",
                self.heartbeat_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        if self.command_history_limit == 0 {
            return Err(ConfigError::Validation(
                "command_history_limit must be greater than zero".to_string(),
            ));
        }
        if self.default_cols == 0 || self.default_rows == 0 {
            return Err(ConfigError::Validation(
                "default_cols and default_rows must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join(APP_DIR)
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            // Use XDG convention on all platforms: ~/.config/termweave
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join(APP_DIR)
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Where the layout/session snapshot lives
    pub fn state_file_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("state.json"))
    }

    /// Where the connection profile list lives
    pub fn profiles_file_path(&self) -> PathBuf {
        self.profiles_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("connections.yaml"))
    }
}
