//! Configuration loading and validation

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub auth: AuthConfig,
    pub defaults: DefaultsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            auth: AuthConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                return Ok(config);
            }
        }
        Ok(Config::default())
    }

    /// Get the config directory path (~/.config/gemchat)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("gemchat"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Resolve the API key: config value first, then GEMINI_API_KEY, then
    /// GOOGLE_API_KEY. A missing key is fatal; nothing works without one.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.auth.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        for var in ["GEMINI_API_KEY", "GOOGLE_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }
        anyhow::bail!("Configuration failed. Missing an API key.")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// JSON file defining the available assistants
    pub assistants_path: PathBuf,
    /// Markdown documentation for the sampling parameters, shown at startup
    pub params_doc_path: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            assistants_path: PathBuf::from("instructions/assistants.json"),
            params_doc_path: Some(PathBuf::from("instructions/params_doc.md")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

/// Initial sampling parameters offered when a new chat is configured
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: "models/gemini-1.5-flash-002".to_string(),
            max_output_tokens: 2048,
            temperature: 0.9,
            top_p: 0.95,
            top_k: 32,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.model, "models/gemini-1.5-flash-002");
        assert_eq!(config.defaults.max_output_tokens, 2048);
        assert!(config.auth.api_key.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[general]
assistants_path = "personas/assistants.json"

[auth]
api_key = "test-key"

[defaults]
model = "models/gemini-2.0-flash-001"
temperature = 1.2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.general.assistants_path,
            PathBuf::from("personas/assistants.json")
        );
        assert_eq!(config.auth.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.defaults.model, "models/gemini-2.0-flash-001");
        assert_eq!(config.defaults.temperature, 1.2);
        // unspecified defaults survive
        assert_eq!(config.defaults.top_k, 32);
    }

    #[test]
    fn test_api_key_from_config_wins() {
        let config = Config {
            auth: AuthConfig {
                api_key: Some("from-config".into()),
            },
            ..Config::default()
        };
        assert_eq!(config.api_key().unwrap(), "from-config");
    }
}
