//! System prompt compilation and request assembly
//!
//! The personality is rendered through two fixed lookup tables, one for tone
//! and one for verbosity. Adding a tone means adding a row to
//! [`builtin::TONES`]; a value without a row renders as the table's fallback
//! entry.
//!
//! # Example
//!
//! ```ignore
//! let personality = PersonalityConfig::default();
//! let messages = build_request("Hi", std::iter::empty(), Some(&personality));
//! assert_eq!(messages.len(), 2);
//! ```

use super::personality::{PersonalityConfig, Tone, Verbosity};
use crate::conversation::PromptMessage;

/// Built-in sentences for each personality setting
pub mod builtin {
    use super::{Tone, Verbosity};

    pub const TONES: &[(Tone, &str)] = &[
        (
            Tone::Mentor,
            "You are a patient and encouraging mentor who explains concepts clearly.",
        ),
        (Tone::Sarcastic, "You are witty and sarcastic, but still helpful."),
        (Tone::Neutral, "You are a helpful and professional assistant."),
        (
            Tone::Enthusiastic,
            "You are energetic and enthusiastic about helping!",
        ),
    ];

    pub const FALLBACK_TONE: Tone = Tone::Neutral;

    pub const VERBOSITIES: &[(Verbosity, &str)] = &[
        (Verbosity::Concise, "Keep your responses brief and to the point."),
        (Verbosity::Detailed, "Provide thorough and detailed explanations."),
        (Verbosity::Balanced, "Balance brevity with necessary detail."),
    ];

    pub const FALLBACK_VERBOSITY: Verbosity = Verbosity::Balanced;
}

fn lookup<K: PartialEq + Copy>(table: &[(K, &'static str)], key: K, fallback: K) -> &'static str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .or_else(|| table.iter().find(|(k, _)| *k == fallback))
        .map(|(_, sentence)| *sentence)
        .unwrap_or_default()
}

pub fn tone_description(tone: Tone) -> &'static str {
    lookup(builtin::TONES, tone, builtin::FALLBACK_TONE)
}

pub fn verbosity_description(verbosity: Verbosity) -> &'static str {
    lookup(builtin::VERBOSITIES, verbosity, builtin::FALLBACK_VERBOSITY)
}

/// Render a personality as a single system prompt: tone, verbosity, then style
pub fn compile_system_prompt(personality: &PersonalityConfig) -> String {
    format!(
        "{} {} {}",
        tone_description(personality.tone),
        verbosity_description(personality.verbosity),
        personality.response_style
    )
}

/// Assemble the ordered message list for a generation request.
///
/// Order is fixed: the compiled system prompt (when a personality is given),
/// then the prior context as provided, then the new user input.
pub fn build_request<I>(
    user_input: &str,
    context: I,
    personality: Option<&PersonalityConfig>,
) -> Vec<PromptMessage>
where
    I: IntoIterator<Item = PromptMessage>,
{
    let context = context.into_iter();
    let mut messages = Vec::with_capacity(context.size_hint().0 + 2);

    if let Some(personality) = personality {
        messages.push(PromptMessage::system(compile_system_prompt(personality)));
    }

    messages.extend(context);
    messages.push(PromptMessage::user(user_input));

    messages
}
