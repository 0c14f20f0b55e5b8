//! Configuration Management
//!
//! Provider settings for esdetector. Values are layered: config file,
//! then environment, then command line flags (applied by the binary).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_URL: &str = "http://localhost:9200";

const ENV_URL: &str = "ELASTICSEARCH_URL";
const ENV_USERNAME: &str = "ELASTICSEARCH_USERNAME";
const ENV_PASSWORD: &str = "ELASTICSEARCH_PASSWORD";
const ENV_VERSION: &str = "ELASTICSEARCH_VERSION";

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Elasticsearch endpoint
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    /// Server version; detected from the cluster when unset
    #[serde(default)]
    pub elasticsearch_version: Option<String>,
    /// Where resource state is kept
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Config {
    /// Directory holding config, state and logs
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("esdetector"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_URL) {
            self.url = Some(url);
        }
        if let Some(username) = get(ENV_USERNAME) {
            self.username = Some(username);
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(version) = get(ENV_VERSION) {
            self.elasticsearch_version = Some(version);
        }
    }

    /// Get effective url (CLI > env > config > default)
    pub fn effective_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string())
    }

    /// Get effective state file path
    pub fn effective_state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_path {
            return path.clone();
        }
        Self::config_dir()
            .map(|d| d.join("state.json"))
            .unwrap_or_else(|| PathBuf::from("esdetector.state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_url(), DEFAULT_URL);
        assert!(config.elasticsearch_version.is_none());
        assert!(!config.insecure);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config {
            url: Some("http://from-file:9200".to_string()),
            username: Some("file-user".to_string()),
            ..Default::default()
        };
        let env: HashMap<&str, &str> = [
            ("ELASTICSEARCH_URL", "https://from-env:9243"),
            ("ELASTICSEARCH_USERNAME", ""),
            ("ELASTICSEARCH_VERSION", "6.8.0"),
        ]
        .into_iter()
        .collect();

        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.effective_url(), "https://from-env:9243");
        assert_eq!(config.username.as_deref(), Some("file-user"));
        assert_eq!(config.elasticsearch_version.as_deref(), Some("6.8.0"));
    }

    #[test]
    fn test_load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"url":"http://es:9200","insecure":true,"elasticsearch_version":"7.10.2"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.effective_url(), "http://es:9200");
        assert!(config.insecure);
        assert_eq!(config.elasticsearch_version.as_deref(), Some("7.10.2"));
    }

    #[test]
    fn test_password_is_not_serialized() {
        let config = Config {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
