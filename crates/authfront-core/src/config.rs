//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend origin, the session store backend, and the
//! last email used to sign in.
//!
//! Configuration is stored at `~/.config/authfront/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "authfront";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the backend origin
pub const BACKEND_URL_ENV: &str = "AUTHFRONT_BACKEND_URL";

/// Origin used when neither the environment nor the config file name one
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Where the session token and cached profile are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub last_email: Option<String>,
    #[serde(default)]
    pub store: StoreBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
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

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file-backed session store and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Resolve the backend origin: environment, then config file, then the default.
    pub fn backend_url(&self) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        Self::resolve_backend_url(env.as_deref(), self.backend_url.as_deref())
    }

    fn resolve_backend_url(env: Option<&str>, configured: Option<&str>) -> String {
        let url = env
            .filter(|s| !s.trim().is_empty())
            .or(configured.filter(|s| !s.trim().is_empty()))
            .unwrap_or(DEFAULT_BACKEND_URL);
        url.trim().trim_end_matches('/').to_string()
    }
}
