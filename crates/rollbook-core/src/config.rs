//! Application configuration management.
//!
//! Holds the record service endpoint and request timeout. Values come from
//! `~/.config/rollbook/config.json`, overridden by the `ROLLBOOK_API_URL`
//! and `ROLLBOOK_TIMEOUT_SECS` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/log directory paths
const APP_NAME: &str = "rollbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Mock API the admin was first built against.
pub const DEFAULT_API_URL: &str = "https://639ac1bf31877e43d6751029.mockapi.io/studentTeacherPage/";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const API_URL_ENV: &str = "ROLLBOOK_API_URL";
const TIMEOUT_ENV: &str = "ROLLBOOK_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(raw) = var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }

    /// Base URL of the collection, always ending in `/`.
    pub fn api_url(&self) -> String {
        let url = self.api_url.as_deref().unwrap_or(DEFAULT_API_URL).trim();
        if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for log files.
    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
