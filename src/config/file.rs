//! Settings loaded from a TOML file
//!
//! Every section and key is optional; anything missing takes its default.
//!
//! ```toml
//! [llm]
//! provider = "ollama"
//! model = "mistral:7b"
//! endpoint = "http://localhost:11434"
//! temperature = 0.7
//! max_tokens = 2000
//! timeout_secs = 30
//!
//! [conversation]
//! max_turns = 10
//! ```

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

use super::ConfigError;

/// Root of the TOML settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Generation backend settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        config.llm.validate()?;
        Ok(config)
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend name: "ollama" or "openai" (any OpenAI-compatible server)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the backend
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How long to wait for a generation before giving up
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding an API key, for servers that need one
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "mistral:7b".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key_env: None,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of turns kept as context
    #[serde(default = "default_max_turns")]
    pub max_turns: NonZeroUsize,
}

fn default_max_turns() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN)
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}
