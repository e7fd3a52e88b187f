use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const MODEL_ENV: &str = "JQ_GEN_MODEL";
pub const MOCK_ENV: &str = "AGENTKIT_USE_MOCK";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Only ever read from the process environment, never from the file.
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub use_mock: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            use_mock: false,
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_config_path() {
            Ok(config_path) => Self::load_from_file(&config_path)?,
            Err(e) => {
                info!("{}, using defaults", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment variables override config file values
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = var(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.anthropic_api_key = Some(api_key);
        }

        if let Some(model) = var(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }

        if var(MOCK_ENV).is_some() {
            self.use_mock = true;
        }
    }

    /// A missing file means defaults; an unreadable or malformed one is an error.
    fn load_from_file(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("No config file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        info!("Loaded config from: {}", config_path.display());
        Ok(config)
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".agentkit").join("config.toml"))
    }

    pub fn get_api_key(&self) -> Option<&str> {
        self.anthropic_api_key.as_deref()
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 1024);
        assert!(config.get_api_key().is_none());
        assert!(!config.is_mock_mode());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("use_mock = true").unwrap();

        assert!(config.is_mock_mode());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_api_key_in_file_is_ignored() {
        let config: Config = toml::from_str("anthropic_api_key = \"sk-file\"").unwrap();

        assert!(config.get_api_key().is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();

        let config = Config::load_from_file(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_tokens = \"lots\"").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str("model = \"file-model\"").unwrap();

        config.apply_env(env_of(&[
            (API_KEY_ENV, "sk-env"),
            (MODEL_ENV, "env-model"),
            (MOCK_ENV, "1"),
        ]));

        assert_eq!(config.get_api_key(), Some("sk-env"));
        assert_eq!(config.model, "env-model");
        assert!(config.is_mock_mode());
    }

    #[test]
    fn test_blank_env_key_is_ignored() {
        let mut config = Config::default();

        config.apply_env(env_of(&[(API_KEY_ENV, "  ")]));

        assert!(config.get_api_key().is_none());
    }
}
