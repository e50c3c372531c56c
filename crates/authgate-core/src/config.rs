//! Gateway configuration.
//!
//! Loaded from `~/.config/authgate/config.json` when present, then overridden
//! by `AUTHGATE_*` environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{CredentialStorage, FileStorage, KeyringStorage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "authgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Fixed deadline for every outbound request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("base_url must not be empty")]
    EmptyBaseUrl,

    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub login_path: String,
    pub profile_path: String,
    pub permissions_path: String,
    pub public_entry_route: String,
    pub default_authenticated_route: String,
    pub storage: StorageKind,
    pub storage_key: String,
    pub last_username: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: "/users/login".to_string(),
            profile_path: "/users/me".to_string(),
            permissions_path: "/users/me/permissions".to_string(),
            public_entry_route: "/login".to_string(),
            default_authenticated_route: "/dashboard".to_string(),
            storage: StorageKind::File,
            storage_key: "token".to_string(),
            last_username: None,
        }
    }
}

impl GatewayConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Self = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
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

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Apply `AUTHGATE_*` overrides. `lookup` is the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("AUTHGATE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("AUTHGATE_TIMEOUT_SECS") {
            self.timeout_secs = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "AUTHGATE_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("AUTHGATE_STORAGE") {
            self.storage = match raw.to_ascii_lowercase().as_str() {
                "file" => StorageKind::File,
                "keyring" => StorageKind::Keyring,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "AUTHGATE_STORAGE",
                        value: raw,
                    })
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the configured durable storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn CredentialStorage>> {
        Ok(match self.storage {
            StorageKind::File => Arc::new(FileStorage::new(self.cache_dir()?, &self.storage_key)),
            StorageKind::Keyring => Arc::new(KeyringStorage::new(&self.storage_key)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.storage, StorageKind::File);
        assert!(config.validate().is_ok());
        assert_eq!(config.login_path, "/users/login");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"base_url": "https://api.example.com/v1", "storage": "keyring"}"#)
                .expect("config json");
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.storage, StorageKind::Keyring);
        assert_eq!(config.login_path, "/users/login");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config
            .apply_env(env(&[
                ("AUTHGATE_BASE_URL", "https://gw.example.com"),
                ("AUTHGATE_TIMEOUT_SECS", "3"),
                ("AUTHGATE_STORAGE", "Keyring"),
            ]))
            .expect("valid overrides");
        assert_eq!(config.base_url, "https://gw.example.com");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.storage, StorageKind::Keyring);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = GatewayConfig::default();
        assert!(config
            .apply_env(env(&[("AUTHGATE_TIMEOUT_SECS", "soon")]))
            .is_err());
        assert!(config
            .apply_env(env(&[("AUTHGATE_STORAGE", "floppy")]))
            .is_err());

        config.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
        config.timeout_secs = 10;
        config.base_url = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBaseUrl)));
    }
}
