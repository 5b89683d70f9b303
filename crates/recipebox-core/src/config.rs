//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, which storage backend holds the session, and the last
//! email used to log in.
//!
//! Configuration is stored at `~/.config/recipebox/config.json`.
//! `RECIPEBOX_API_URL` and `RECIPEBOX_STORAGE` override the file.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{FileStorage, KeyringStorage, SessionStorage};

/// Application name used for config/data directory paths
const APP_NAME: &str = "recipebox";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

pub const ENV_API_URL: &str = "RECIPEBOX_API_URL";
pub const ENV_STORAGE: &str = "RECIPEBOX_STORAGE";

/// Where the session token and user are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub last_email: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_url(),
            storage: StorageBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Config file merged with environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply overrides from `lookup` (the process environment in `load`).
    /// Blank values are ignored; an unknown backend name keeps the current one.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_blank(ENV_API_URL) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(storage) = non_blank(ENV_STORAGE) {
            match storage.parse() {
                Ok(backend) => self.storage = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORAGE),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Open the configured session storage backend.
    pub fn open_storage(&self) -> Result<Box<dyn SessionStorage>> {
        Ok(match self.storage {
            StorageBackend::File => Box::new(FileStorage::new(Self::data_dir()?)),
            StorageBackend::Keyring => Box::new(KeyringStorage::new(APP_NAME)),
        })
    }
}
