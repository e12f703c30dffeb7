use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub extra_common_terms: Vec<String>,
    pub extra_severe_terms: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, falling back to defaults when
    /// no file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Pick the backend URL: explicit flag or env value first, then the
    /// config file, then the local development server.
    pub fn resolve_base_url(&self, override_url: Option<&str>) -> String {
        [override_url, self.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("pd-assist").join("config.json"))
    }
}

/// Directory for logs and saved transcripts.
pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(data_dir.join("pd-assist"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://10.0.0.2:8080".to_string()),
            extra_common_terms: vec!["Sweating".to_string()],
            extra_severe_terms: vec![],
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url": "http://example.org"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://example.org"));
        assert!(config.extra_common_terms.is_empty());
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            base_url: Some("http://from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_base_url(Some("http://from-flag")), "http://from-flag");
        assert_eq!(config.resolve_base_url(None), "http://from-config");
        assert_eq!(Config::new().resolve_base_url(None), DEFAULT_BASE_URL);
        assert_eq!(Config::new().resolve_base_url(Some("  ")), DEFAULT_BASE_URL);
    }
}
