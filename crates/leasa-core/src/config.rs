use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LeasaError, Result};

/// Top-level configuration for the Leasa service.
///
/// Loaded from `~/.leasa/config.toml` by default. Secrets are never stored
/// here; `llm.api_key_env` names the environment variable holding the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeasaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl LeasaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LeasaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        let (config, error) = Self::load_with_fallback(path);
        if let Some(e) = error {
            warn!(
                "Failed to load config from {}: {}. Using defaults.",
                path.display(),
                e
            );
        }
        config
    }

    /// Like [`load_or_default`](Self::load_or_default), but hands the load
    /// error back instead of logging it, for callers that set up logging
    /// from the config itself.
    pub fn load_with_fallback(path: &Path) -> (Self, Option<LeasaError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.leasa/data".to_string(),
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Text-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only "gemini" is built in.
    pub provider: String,
    pub model: String,
    /// Base URL of the models endpoint.
    pub base_url: String,
    /// Environment variable that holds the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    /// HTTP timeout for one completion call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// A missing or blank key is a configuration error; the process must not
    /// start without it.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(LeasaError::Config(format!(
                "{} environment variable is not set",
                self.api_key_env
            ))),
        }
    }
}

/// Conversational engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Reject all turns when false.
    pub enabled: bool,
    /// Maximum tenant message length in characters.
    pub max_message_chars: usize,
    /// Prompt size budget in characters; 0 disables truncation.
    pub max_prompt_chars: usize,
    /// Replaces the built-in matching policy when set.
    pub policy_text: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_chars: 2000,
            max_prompt_chars: 120_000,
            policy_text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = LeasaConfig::default();
        assert_eq!(config.general.data_dir, "~/.leasa/data");
        assert_eq!(config.general.port, 8000);
        assert_eq!(config.llm.model, "gemini-1.5-flash-latest");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.llm.max_output_tokens, 2048);
        assert_eq!(config.llm.top_k, 40);
        assert!(config.chat.enabled);
        assert_eq!(config.chat.max_message_chars, 2000);
        assert!(config.chat.policy_text.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/leasa"
log_level = "debug"
port = 9000

[llm]
model = "gemini-2.0-flash"
temperature = 0.2

[chat]
max_prompt_chars = 5000
policy_text = "Be brief."
"#;
        let file = create_temp_config(content);
        let config = LeasaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/leasa");
        assert_eq!(config.general.port, 9000);
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.top_p, 0.95);
        assert_eq!(config.chat.max_prompt_chars, 5000);
        assert_eq!(config.chat.policy_text.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = LeasaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[general\nport = ");
        let result = LeasaConfig::load(file.path());
        assert!(matches!(result, Err(LeasaError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = LeasaConfig::load_or_default(Path::new("/nonexistent/leasa.toml"));
        assert_eq!(config.general.port, 8000);
    }

    #[test]
    fn test_load_with_fallback_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[general\nport = ").unwrap();

        let (config, error) = LeasaConfig::load_with_fallback(&path);
        assert_eq!(config.general.port, 8000);
        assert!(error.is_some());

        let (_, missing) = LeasaConfig::load_with_fallback(Path::new("/nonexistent/leasa.toml"));
        assert!(missing.is_some());
    }

    #[test]
    fn test_load_with_fallback_ok_has_no_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = LeasaConfig::default();
        config.general.port = 9100;
        config.save(&path).unwrap();

        let (loaded, error) = LeasaConfig::load_with_fallback(&path);
        assert!(error.is_none());
        assert_eq!(loaded.general.port, 9100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LeasaConfig::default();
        config.chat.max_message_chars = 10;
        config.save(&path).unwrap();

        let reloaded = LeasaConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.max_message_chars, 10);
        assert_eq!(reloaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_resolve_api_key_missing_is_config_error() {
        let llm = LlmConfig {
            api_key_env: "LEASA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = llm.resolve_api_key().unwrap_err();
        assert!(matches!(err, LeasaError::Config(_)));
        assert!(err.to_string().contains("LEASA_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
