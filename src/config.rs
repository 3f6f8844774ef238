//! Configuration handling
//!
//! Reads `rental-sync.toml` from the configuration directory. A missing file
//! means local development defaults.
//!
//! ## Environment Variables
//!
//! The following environment variables override config file settings:
//!
//! - `RENTAL_API_URL` - Base URL of the REST API
//! - `RENTAL_API_TOKEN` - Bearer token sent with every request
//! - `RENTAL_STORE_PATH` - Path of the local SQLite cache
//! - `RENTAL_REQUEST_TIMEOUT_SECS` - Remote request timeout
//!
//! These can be set in a `.env` file in the configuration directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "rental-sync.toml";

/// Name of the application data directory
pub const APP_NAME: &str = "rental-sync";

pub const ENV_API_URL: &str = "RENTAL_API_URL";
pub const ENV_API_TOKEN: &str = "RENTAL_API_TOKEN";
pub const ENV_STORE_PATH: &str = "RENTAL_STORE_PATH";
pub const ENV_REQUEST_TIMEOUT: &str = "RENTAL_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; empty means unauthenticated
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Path under the API base URL used to check reachability
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

fn default_probe_path() -> String {
    "/".to_string()
}

fn default_probe_timeout() -> u64 {
    3000
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_path: default_probe_path(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Relationship levels attached on read
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_depth() -> usize {
    crate::sync::DEFAULT_DEPTH
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            depth: default_depth(),
        }
    }
}

impl Config {
    /// Load configuration from a directory
    ///
    /// This also loads any `.env` file in the directory and applies
    /// environment variable overrides.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let mut config = Self::from_file(dir)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse `rental-sync.toml` without looking at the environment.
    pub fn from_file(dir: &Path) -> anyhow::Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in practice)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(url) = set(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = set(ENV_API_TOKEN) {
            self.api.token = token;
        }
        if let Some(path) = set(ENV_STORE_PATH) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(secs) = set(ENV_REQUEST_TIMEOUT).and_then(|v| v.parse::<u64>().ok()) {
            self.api.request_timeout_secs = secs;
        }
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_timeout_ms)
    }

    pub fn token(&self) -> Option<&str> {
        Some(self.api.token.as_str()).filter(|t| !t.is_empty())
    }
}
