//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend base URL, the resume processing endpoint, the request timeout and
//! the last username used to sign in.
//!
//! Configuration is stored at `~/.config/applyzen/config.json`. The
//! `APPLYZEN_API_URL` and `APPLYZEN_RESUME_URL` variables (from the
//! environment or a `.env` file) override the stored URLs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "applyzen";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend the web frontend talks to in development.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Resume processing endpoint. The processing backend is stubbed, so this
/// host is not expected to answer.
pub const DEFAULT_RESUME_ENDPOINT: &str = "https://fake-api.example.com/process-resume";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const API_URL_ENV: &str = "APPLYZEN_API_URL";
const RESUME_URL_ENV: &str = "APPLYZEN_RESUME_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub resume_endpoint: String,
    pub request_timeout_secs: u64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            resume_endpoint: DEFAULT_RESUME_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        Ok(Self::load_file()?.with_overrides(
            dotenvy::var(API_URL_ENV).ok(),
            dotenvy::var(RESUME_URL_ENV).ok(),
        ))
    }

    /// Config as stored on disk, without overrides
    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Record the last username in memory and on disk. Only that field is
    /// written back, so overrides never end up in the file.
    pub fn remember_username(&mut self, username: &str) -> Result<()> {
        self.last_username = Some(username.to_string());
        let mut stored = Self::load_file()?;
        stored.last_username = Some(username.to_string());
        stored.save()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace the URLs with the given overrides, ignoring blank values
    pub fn with_overrides(mut self, api_url: Option<String>, resume_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "API base URL overridden");
            self.api_base_url = url;
        }
        if let Some(url) = resume_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "Resume endpoint overridden");
            self.resume_endpoint = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
