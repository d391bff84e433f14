use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const API_URL_VAR: &str = "READMORE_API_URL";
pub const RETRY_BUDGET_VAR: &str = "READMORE_RETRY_BUDGET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the votes backend
    pub api_url: String,
    /// Attempts per mutation before it is dropped
    pub retry_budget: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Toast shown after a read-more vote. Empty title and text disable it.
    pub message_title: String,
    pub message_text: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://iwanttoreadmore.com".to_string(),
            retry_budget: 3,
            timeout_secs: 10,
            message_title: "I Want To Read More".to_string(),
            message_text: "Thank you! I will write more on this topic in the future!".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("readmore"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.json")
    }

    /// Read the config file; a missing file means defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "config loaded");
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(API_URL_VAR).filter(|u| !u.trim().is_empty()) {
            info!("{API_URL_VAR} set, using {url}");
            self.api_url = url;
        }

        if let Some(value) = lookup(RETRY_BUDGET_VAR) {
            self.retry_budget = value
                .trim()
                .parse()
                .ok()
                .filter(|budget| *budget > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    key: RETRY_BUDGET_VAR.to_string(),
                    value,
                })?;
        }

        Ok(self)
    }

    /// Config file plus environment overrides
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::load(&Self::default_path())?.apply_env(|key| std::env::var(key).ok())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
