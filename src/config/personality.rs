//! Personality preferences that shape the system prompt

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Mentor,
    Sarcastic,
    #[default]
    Neutral,
    Enthusiastic,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Mentor, Tone::Sarcastic, Tone::Neutral, Tone::Enthusiastic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Mentor => "mentor",
            Tone::Sarcastic => "sarcastic",
            Tone::Neutral => "neutral",
            Tone::Enthusiastic => "enthusiastic",
        }
    }

    /// Unrecognised names resolve to the default tone
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tone| tone.as_str() == name)
            .unwrap_or_else(|| {
                tracing::warn!(tone = %name, "Unknown tone, falling back to neutral");
                Tone::default()
            })
    }
}

impl<'de> Deserialize<'de> for Tone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Tone::from_name(&name))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Concise,
    Detailed,
    #[default]
    Balanced,
}

impl Verbosity {
    pub const ALL: [Verbosity; 3] = [Verbosity::Concise, Verbosity::Detailed, Verbosity::Balanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Concise => "concise",
            Verbosity::Detailed => "detailed",
            Verbosity::Balanced => "balanced",
        }
    }

    /// Unrecognised names resolve to the default verbosity
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|verbosity| verbosity.as_str() == name)
            .unwrap_or_else(|| {
                tracing::warn!(verbosity = %name, "Unknown verbosity, falling back to balanced");
                Verbosity::default()
            })
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Verbosity::from_name(&name))
    }
}

/// Presentation preferences, persisted under the `personality` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    pub tone: Tone,
    pub verbosity: Verbosity,
    pub response_style: String,

    /// Used by speech output only
    pub voice_name: String,

    /// Used by speech output only
    pub sound_cues_enabled: bool,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            verbosity: Verbosity::default(),
            response_style: "helpful and informative".to_string(),
            voice_name: "Samantha".to_string(),
            sound_cues_enabled: true,
        }
    }
}

impl PersonalityConfig {
    /// Apply a partial update keyed by field name.
    ///
    /// Unknown field names are skipped, as are values of the wrong type.
    /// Returns the names of the fields that were changed.
    pub fn apply_changes(&mut self, changes: &Map<String, Value>) -> Vec<String> {
        let mut applied = Vec::new();

        for (field, value) in changes {
            let updated = match field.as_str() {
                "tone" => assign(&mut self.tone, field, value),
                "verbosity" => assign(&mut self.verbosity, field, value),
                "response_style" => assign(&mut self.response_style, field, value),
                "voice_name" => assign(&mut self.voice_name, field, value),
                "sound_cues_enabled" => assign(&mut self.sound_cues_enabled, field, value),
                _ => {
                    tracing::debug!(field = %field, "Ignoring unknown personality field");
                    false
                }
            };

            if updated {
                applied.push(field.clone());
            }
        }

        applied
    }
}

fn assign<T: DeserializeOwned>(slot: &mut T, field: &str, value: &Value) -> bool {
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(e) => {
            tracing::warn!(field, error = %e, "Rejected personality value");
            false
        }
    }
}
