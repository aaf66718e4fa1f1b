//! Application configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is read by `main`).

pub mod file;
pub mod personality;
pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use file::{ConversationConfig, FileConfig, LlmConfig};
pub use personality::{PersonalityConfig, Tone, Verbosity};
pub use prompts::build_request;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for preferences and the optional config file
    pub data_dir: PathBuf,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("JARVIS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(&lookup));

        let explicit = lookup("JARVIS_CONFIG").map(PathBuf::from);
        let file = match explicit {
            Some(path) => FileConfig::from_file(&path)?,
            None => {
                let path = data_dir.join("config.toml");
                if path.exists() {
                    FileConfig::from_file(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let mut config = Self {
            data_dir,
            llm: file.llm,
            conversation: file.conversation,
        };
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("JARVIS_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("JARVIS_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.endpoint = url;
        }
        if let Some(turns) = lookup("JARVIS_MAX_TURNS") {
            self.conversation.max_turns = turns.parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "JARVIS_MAX_TURNS must be a positive integer, got '{}'",
                    turns
                ))
            })?;
        }
        Ok(())
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }
}

fn default_data_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let home = lookup("HOME")
        .or_else(|| lookup("USERPROFILE"))
        .unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".jarvis")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
