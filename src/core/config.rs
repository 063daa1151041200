//! Configuration management for b3
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/b3/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::error::{B3Error, Result};

/// Main configuration for b3
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Model configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Orchestration behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Document store location
    #[serde(default)]
    pub store: StoreConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; falls back to GEMINI_API_KEY / GOOGLE_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model behind the top-level agent
    /// Default: gemini-2.5-pro
    pub primary: String,
    /// Model used by delegated experts and file analysis
    /// Default: gemini-2.5-flash
    pub expert: String,
}

/// How the engine treats turns carrying several call requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Execute only the first call request, discard the others
    #[default]
    First,
    /// Execute every call request in order and resend all responses together
    All,
}

impl FromStr for DispatchMode {
    type Err = B3Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(B3Error::config(format!(
                "unknown dispatch mode '{}' (expected 'first' or 'all')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::First => write!(f, "first"),
            DispatchMode::All => write!(f, "all"),
        }
    }
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum capability calls per top-level question (0 = unlimited)
    /// Default: 25
    pub max_calls: usize,
    /// Multi-call turn handling
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// Whether to show debug output
    pub debug: bool,
}

/// Local document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the archive and workspace folders
    pub root: PathBuf,
    /// Folder of curated personal documents
    pub archive_folder: String,
    /// Folder of in-progress procedures; the only place files may be deleted
    pub workspace_folder: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("GOOGLE_API_KEY"))
                .ok(),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            timeout_secs: 300,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary: env::var("B3_PRIMARY_MODEL").unwrap_or_else(|_| "gemini-2.5-pro".to_string()),
            expert: env::var("B3_EXPERT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_calls: 25,
            dispatch: DispatchMode::default(),
            debug: env::var("B3_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let root = env::var("B3_ROOT").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("B3Drive")
        });
        Self {
            root,
            archive_folder: "B3".to_string(),
            workspace_folder: "B4".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("b3")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                if Self::config_exists() {
                    tracing::warn!("ignoring config file: {}", e);
                }
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(B3Error::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| B3Error::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| B3Error::config(format!("Failed to parse config: {}", e)))?;

        // `save` never writes the key
        if config.gemini.api_key.is_none() {
            config.gemini.api_key = GeminiConfig::default().api_key;
        }

        Ok(config)
    }

    /// Save configuration to file (the API key is never written)
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| B3Error::config(format!("Failed to create config dir: {}", e)))?;
        }

        let mut sanitized = self.clone();
        sanitized.gemini.api_key = None;

        let content = toml::to_string_pretty(&sanitized)
            .map_err(|e| B3Error::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| B3Error::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let mut config = Config::default();
        config.gemini.api_key = None;
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_calls, 25);
        assert_eq!(config.agent.dispatch, DispatchMode::First);
        assert_eq!(config.store.archive_folder, "B3");
        assert_eq!(config.store.workspace_folder, "B4");
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = Config::from_toml(
            r#"
[agent]
max_calls = 4
dispatch = "all"
debug = false
"#,
        )
        .unwrap();
        assert_eq!(config.agent.max_calls, 4);
        assert_eq!(config.agent.dispatch, DispatchMode::All);
        assert_eq!(config.store.workspace_folder, "B4");
    }

    #[test]
    fn test_dispatch_mode_parsing() {
        assert_eq!("ALL".parse::<DispatchMode>().unwrap(), DispatchMode::All);
        assert_eq!("first".parse::<DispatchMode>().unwrap(), DispatchMode::First);
        assert!("some".parse::<DispatchMode>().is_err());
    }

    #[test]
    fn test_default_toml_has_no_key() {
        let toml_str = Config::default_config_toml();
        assert!(toml_str.contains("max_calls"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().ends_with("b3"));
    }
}
