//! Configuration management for parley.
//!
//! Loads configuration from `$PARLEY_HOME/config.toml` with sensible
//! defaults. The resolved [`Config`] is constructed once at startup and
//! passed down; nothing in the core reads configuration ambiently.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::ProviderKind;

pub mod paths {
    //! Path resolution for parley configuration and data directories.
    //!
    //! `PARLEY_HOME` resolution order:
    //! 1. `PARLEY_HOME` environment variable (if set)
    //! 2. `~/.config/parley` (default)

    use std::path::PathBuf;

    /// Returns the parley home directory.
    pub fn parley_home() -> PathBuf {
        if let Ok(home) = std::env::var("PARLEY_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("parley"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        parley_home().join("config.toml")
    }

    /// Returns the path to the conversations directory.
    pub fn conversations_dir() -> PathBuf {
        parley_home().join("conversations")
    }

    /// Returns the path to the log directory.
    pub fn logs_dir() -> PathBuf {
        parley_home().join("logs")
    }
}

/// Per-provider configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Base URL override (mainly for proxies and tests).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Provider sections, one per supported vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
    pub google: ProviderConfig,
    pub openai: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::OpenAI => &self.openai,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The provider to chat with ("anthropic", "google", "openai").
    pub provider: String,

    /// The model to use.
    pub model: String,

    /// Maximum tokens for responses (providers that require it).
    pub max_tokens: Option<u32>,

    /// Provider configuration (credentials, base URLs).
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    const DEFAULT_PROVIDER: &str = "anthropic";
    const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// The configured provider kind, when the id is recognized.
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        ProviderKind::from_id(&self.provider)
    }

    /// Writes a commented default config file if none exists yet.
    /// Returns true when a file was written.
    pub fn init(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, Self::generate())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }

    /// Generates the default config file contents.
    pub fn generate() -> String {
        format!(
            r#"# parley configuration

# Provider to chat with: "anthropic", "google", or "openai".
provider = "{provider}"

# Model identifier, passed to the provider verbatim.
# See `parley models` for the known catalog.
model = "{model}"

# Maximum response tokens (used by providers that require a limit).
# max_tokens = 4096

# Credentials can live here or in the environment:
# ANTHROPIC_API_KEY, GEMINI_API_KEY, OPENAI_API_KEY.
[providers.anthropic]
# api_key = "sk-ant-..."
# base_url = "https://api.anthropic.com"

[providers.google]
# api_key = "..."

[providers.openai]
# api_key = "sk-..."
"#,
            provider = Self::DEFAULT_PROVIDER,
            model = Self::DEFAULT_MODEL,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Self::DEFAULT_PROVIDER.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: None,
            providers: ProvidersConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert!(config.providers.anthropic.effective_api_key().is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "provider = \"google\"\nmodel = \"gemini-2.5-pro\"\n\n[providers.google]\napi_key = \"g-key\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider_kind(), Some(ProviderKind::Google));
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.providers.google.effective_api_key(), Some("g-key"));
        assert!(config.providers.openai.effective_api_key().is_none());
    }

    #[test]
    fn generated_default_config_parses_back() {
        let config: Config = toml::from_str(&Config::generate()).unwrap();
        assert_eq!(config.provider, Config::DEFAULT_PROVIDER);
        assert_eq!(config.model, Config::DEFAULT_MODEL);
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::init(&path).unwrap());
        fs::write(&path, "provider = \"openai\"\n").unwrap();
        assert!(!Config::init(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap().provider, "openai");
    }

    #[test]
    fn blank_api_key_is_treated_as_unset() {
        let section = ProviderConfig {
            api_key: Some("   ".to_string()),
            base_url: None,
        };
        assert!(section.effective_api_key().is_none());
    }
}
