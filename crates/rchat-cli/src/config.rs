//! Configuration file support

use rchat_ai::{GatewayConfig, GenerationConfig};
use rchat_core::storage::default_history_path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for rchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini model identifier
    pub model: Option<String>,
    /// Start in dark mode (default false)
    pub dark_mode: Option<bool>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Where the search history is persisted
    pub history_file: Option<PathBuf>,
    /// Milliseconds per revealed character
    pub reveal_interval_ms: Option<u64>,
    /// Seconds before a request is given up
    pub request_timeout_secs: Option<u64>,
    /// Locale for speech capture
    pub speech_locale: Option<String>,
    /// Sampling parameters
    pub generation: GenerationSettings,
    /// API keys (alternative to environment variables)
    pub api_keys: ApiKeys,
}

/// Overrides for the generation parameters; unset fields keep the defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rchat")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`. Missing or unreadable files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some(rchat_ai::DEFAULT_MODEL.to_string()),
            dark_mode: Some(false),
            tui: Some(true),
            ..Default::default()
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Generation parameters with config overrides applied
    pub fn generation_config(&self) -> GenerationConfig {
        let defaults = GenerationConfig::default();
        let g = &self.generation;
        GenerationConfig {
            temperature: g.temperature.unwrap_or(defaults.temperature),
            top_p: g.top_p.unwrap_or(defaults.top_p),
            top_k: g.top_k.unwrap_or(defaults.top_k),
            max_output_tokens: g.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            ..defaults
        }
    }

    /// Gateway settings; a model given on the command line wins
    pub fn gateway_config(&self, model: Option<&str>) -> GatewayConfig {
        let model = model
            .or(self.model.as_deref())
            .unwrap_or(rchat_ai::DEFAULT_MODEL);
        GatewayConfig {
            generation: self.generation_config(),
            ..GatewayConfig::for_model(model)
        }
    }

    /// API key from the config file, then the environment
    pub fn get_api_key(&self) -> Option<String> {
        rchat_ai::providers::get_api_key(
            self.api_keys.google.as_deref(),
            rchat_ai::providers::google::API_KEY_ENV_VARS,
        )
        .ok()
    }

    /// History file location; a path given on the command line wins
    pub fn history_path(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.history_file.clone())
            .or_else(default_history_path)
    }

    pub fn reveal_interval(&self) -> Duration {
        self.reveal_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(rchat_tui::DEFAULT_REVEAL_INTERVAL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(rchat_core::DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# rchat configuration file
# Place at ~/.config/rchat/config.toml (Linux), ~/Library/Application Support/rchat/config.toml (Mac)
# or %APPDATA%\rchat\config.toml (Windows). RCHAT_CONFIG_PATH overrides the location.

# Gemini model to use
model = "gemini-2.0-flash"

# Start in dark mode (toggle at runtime with Ctrl+T or /theme)
dark_mode = false

# Whether to use TUI mode by default
# Set to false for simple stdin/stdout mode
tui = true

# Where search history is stored (default: <data dir>/rchat/history.json)
# history_file = "/home/me/.local/share/rchat/history.json"

# Milliseconds per character when revealing a reply
reveal_interval_ms = 20

# Give up on a reply after this many seconds
request_timeout_secs = 60

# Locale used for voice input
speech_locale = "en-US"

[generation]
temperature = 1.0
top_p = 0.95
top_k = 40
max_output_tokens = 8192

# API key (optional - GOOGLE_API_KEY or GEMINI_API_KEY also work)
[api_keys]
# google = "..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.reveal_interval(), Duration::from_millis(20));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.generation_config(), GenerationConfig::default());
    }

    #[test]
    fn test_partial_generation_overrides() {
        let config: Config = toml::from_str("[generation]\ntemperature = 0.2\n").unwrap();
        let generation = config.generation_config();
        assert_eq!(generation.temperature, 0.2);
        assert_eq!(generation.top_k, 40);
        assert_eq!(generation.max_output_tokens, 8192);
    }

    #[test]
    fn test_flag_model_wins() {
        let config: Config = toml::from_str("model = \"gemini-1.5-pro\"").unwrap();
        assert_eq!(config.gateway_config(None).model, "gemini-1.5-pro");
        assert_eq!(config.gateway_config(Some("gemini-exp")).model, "gemini-exp");
        assert_eq!(Config::default().gateway_config(None).model, rchat_ai::DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [not toml").unwrap();
        let config = Config::load_from(&path);
        assert!(config.model.is_none());
        assert!(Config::load_from(&dir.path().join("missing.toml")).model.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            model: Some("gemini-2.0-flash".into()),
            history_file: Some(PathBuf::from("/tmp/h.json")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        assert_eq!(loaded.model, config.model);
        assert_eq!(loaded.history_path(None), Some(PathBuf::from("/tmp/h.json")));
        assert_eq!(
            loaded.history_path(Some(Path::new("/x.json"))),
            Some(PathBuf::from("/x.json"))
        );
    }
}
