use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Name given to the default list when it has to be created
    #[serde(default = "default_list_name")]
    pub default_list_name: String,
    /// Quiet period before an edited note is written out
    #[serde(default = "default_note_autosave_ms")]
    pub note_autosave_ms: u64,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_challenge_name")]
    pub name: String,
    #[serde(default = "default_challenge_days")]
    pub total_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_filter: default_log_filter(),
            default_list_name: default_list_name(),
            note_autosave_ms: default_note_autosave_ms(),
            challenge: ChallengeConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            name: default_challenge_name(),
            total_days: default_challenge_days(),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_log_filter() -> String {
    "warn".to_string()
}

fn default_list_name() -> String {
    "Inbox".to_string()
}

fn default_note_autosave_ms() -> u64 {
    500
}

fn default_challenge_name() -> String {
    "50-day reset".to_string()
}

fn default_challenge_days() -> u32 {
    crate::challenge::DEFAULT_CHALLENGE_DAYS
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from file, or create default if missing.
    /// Uses the provided profile to determine config and database paths.
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let mut config = Self::load_from_path(&config_path)?;
            // Ensure database path matches profile (in case config was manually edited)
            config.database_path = Self::default_database_path_for_profile(profile);
            Ok(config)
        } else {
            let mut config = Config {
                database_path: Self::default_database_path_for_profile(profile),
                ..Config::default()
            };
            if let Err(ref e) = config.save_to_path(&config_path) {
                tracing::error!(path = %config_path.display(), "failed to save config file: {}", e);
            }
            Ok(config)
        }
    }

    /// Load configuration from an explicit file path, keeping whatever
    /// database path the file names.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.challenge.total_days == 0 {
            return Err(ConfigError::InvalidValue(
                "challenge.total_days must be at least 1".to_string(),
            ));
        }
        if self.default_list_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "default_list_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file for the given profile
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("sage.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/sage-dev/sage.db".to_string(),
                utils::Profile::Prod => "~/.local/share/sage/sage.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    pub fn note_autosave_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.note_autosave_ms)
    }
}
