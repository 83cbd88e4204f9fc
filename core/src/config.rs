//! Configuration loading and validation.
//!
//! Settings come from a TOML file, then environment overrides, then
//! `validate()`. Every section is `#[serde(default)]`, so a partial file only
//! replaces the keys it names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shopping-lists.toml";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub home_assistant: HomeAssistantConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the Home Assistant instance.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    /// Base URL, e.g. `http://homeassistant.local:8123`.
    pub url: String,
    /// Long-lived access token.
    pub token: String,
    /// List read by `items` when no `--list` is given.
    pub todo_list_entity_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of off, error, warn, info, debug, trace.
    pub level: String,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            url: "http://supervisor/core".to_string(),
            token: String::new(),
            todo_list_entity_id: "todo.shopping".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for HomeAssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeAssistantConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("todo_list_entity_id", &self.todo_list_entity_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl HomeAssistantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing("home_assistant.url"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "home_assistant.url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::Missing("home_assistant.token"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "home_assistant.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load from `path`, or from `shopping-lists.toml` in the working
    /// directory if it exists, or fall back to defaults. Environment
    /// overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file(path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let current_dir_config = PathBuf::from(DEFAULT_CONFIG_FILE);
        current_dir_config.exists().then_some(current_dir_config)
    }

    /// Apply `HA_URL`, `HA_TOKEN`, `TODO_LIST_ENTITY_ID`, `HA_TIMEOUT_SECS`
    /// and `LOG_LEVEL` from `lookup`. Empty values are ignored; a timeout
    /// that does not parse is rejected.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("HA_URL") {
            self.home_assistant.url = url;
        }
        if let Some(token) = get("HA_TOKEN") {
            self.home_assistant.token = token;
        }
        if let Some(entity_id) = get("TODO_LIST_ENTITY_ID") {
            self.home_assistant.todo_list_entity_id = entity_id;
        }
        if let Some(timeout) = get("HA_TIMEOUT_SECS") {
            self.home_assistant.timeout_secs = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "HA_TIMEOUT_SECS must be a whole number of seconds, got '{timeout}'"
                ))
            })?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.home_assistant.validate()?;
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        Ok(())
    }
}
