//! User preference storage
//!
//! Preferences live in a single JSON document. The `personality` key feeds the
//! system prompt; every other key belongs to other features and is carried
//! through untouched when the personality is saved.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use crate::config::PersonalityConfig;

const PERSONALITY_KEY: &str = "personality";

/// Errors from preference persistence
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The whole preference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(Map<String, Value>);

impl Default for Preferences {
    fn default() -> Self {
        let document = json!({
            "personality": PersonalityConfig::default(),
            "wake_word": "Hey Jarvis",
            "default_language": "python",
            "project_templates": {},
            "command_whitelist": [],
            "study_topics": {},
        });

        match document {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }
}

impl Preferences {
    /// Personality settings. Each missing or malformed field takes its default
    /// on its own; the rest of the section is kept.
    pub fn personality(&self) -> PersonalityConfig {
        let mut personality = PersonalityConfig::default();
        match self.0.get(PERSONALITY_KEY) {
            Some(Value::Object(stored)) => {
                personality.apply_changes(stored);
            }
            Some(other) => {
                tracing::warn!(value = %other, "Malformed personality preferences, using defaults");
            }
            None => {}
        }
        personality
    }

    /// Replace the personality section, leaving sibling keys as they are
    pub fn set_personality(&mut self, personality: &PersonalityConfig) -> Result<(), PreferenceError> {
        let value = serde_json::to_value(personality)?;
        self.0.insert(PERSONALITY_KEY.to_string(), value);
        Ok(())
    }

    /// Write only `fields` of `personality` into the stored section.
    ///
    /// Other stored fields keep their raw values, including tone or verbosity
    /// names this build does not know. A missing or non-object section is
    /// replaced whole.
    pub fn merge_personality(
        &mut self,
        personality: &PersonalityConfig,
        fields: &[String],
    ) -> Result<(), PreferenceError> {
        match self.0.get_mut(PERSONALITY_KEY) {
            Some(Value::Object(stored)) => {
                let value = serde_json::to_value(personality)?;
                for field in fields {
                    if let Some(updated) = value.get(field.as_str()) {
                        stored.insert(field.clone(), updated.clone());
                    }
                }
                Ok(())
            }
            _ => self.set_personality(personality),
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[cfg(test)]
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

/// Where preferences are kept between runs
pub trait PreferenceStore: Send + Sync {
    /// Current document. Falls back to the default document rather than failing.
    fn load(&self) -> Preferences;

    /// Overwrite the stored document
    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError>;
}

/// Preferences kept in a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self) -> Preferences {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored preferences, using defaults");
                return Preferences::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Error loading preferences. Using defaults.");
                return Preferences::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Error loading preferences. Using defaults.");
            Preferences::default()
        })
    }

    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(preferences)?;
        std::fs::write(&self.path, content)?;

        tracing::debug!(path = %self.path.display(), "Preferences saved");
        Ok(())
    }
}

/// Process-local store for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: std::sync::Mutex<Option<Preferences>>,
    saves: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl InMemoryStore {
    pub fn with(preferences: Preferences) -> Self {
        Self {
            document: std::sync::Mutex::new(Some(preferences)),
            saves: Default::default(),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl PreferenceStore for InMemoryStore {
    fn load(&self) -> Preferences {
        self.document.lock().unwrap().clone().unwrap_or_default()
    }

    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        *self.document.lock().unwrap() = Some(preferences.clone());
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
