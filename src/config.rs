//! Client configuration loaded from `~/.config/pdfspot/config.toml`.
//!
//! Every field is optional in the file. Environment overrides are applied
//! on top: `PDFSPOT_BACKEND_URL`, then the bare `BACKEND_URL` used by the
//! extraction proxy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the extraction backend or proxy.
    pub backend_url: String,
    /// Path of the streaming extraction endpoint.
    pub extract_path: String,
    /// Path of the health probe.
    pub health_path: String,
    /// Seconds to wait for the initial connection.
    pub connect_timeout_secs: u64,
    /// Chunk size used when replaying recorded streams.
    pub replay_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            extract_path: "/extract".to_string(),
            health_path: "/health".to_string(),
            connect_timeout_secs: 10,
            replay_chunk_size: crate::ingest::replay::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load the config file (if present) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(&config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PDFSPOT_BACKEND_URL")
            .or_else(|| lookup("BACKEND_URL"))
            .filter(|u| !u.trim().is_empty())
        {
            self.backend_url = url;
        }
    }

    /// Full URL of `path` on the backend.
    pub fn endpoint(&self, path: &str) -> Result<url::Url> {
        let base = url::Url::parse(&self.backend_url)
            .with_context(|| format!("invalid backend URL {}", self.backend_url))?;
        base.join(path)
            .with_context(|| format!("invalid endpoint path {path}"))
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfspot")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
backend_url = "http://extract.internal:9000"
connect_timeout_secs = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend_url, "http://extract.internal:9000");
        assert_eq!(config.connect_timeout_secs, 3);
        assert_eq!(config.extract_path, "/extract");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend_url = [").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn env_overrides_prefer_namespaced_key() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PDFSPOT_BACKEND_URL" => Some("http://a:1".into()),
            "BACKEND_URL" => Some("http://b:2".into()),
            _ => None,
        });
        assert_eq!(config.backend_url, "http://a:1");

        let mut config = Config::default();
        config.apply_env(|key| (key == "BACKEND_URL").then(|| "http://b:2".to_string()));
        assert_eq!(config.backend_url, "http://b:2");

        let mut config = Config::default();
        config.apply_env(|_| Some("  ".into()));
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn endpoint_joins_paths() {
        let config = Config::default();
        assert_eq!(config.endpoint("/extract").unwrap().as_str(), "http://localhost:8000/extract");
        let bad = Config { backend_url: "not a url".into(), ..Config::default() };
        assert!(bad.endpoint("/extract").is_err());
    }
}
