//! Slash commands understood by the interactive prompt

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Export,
    Clear,
    Personality,
    /// Partial personality update, e.g. `/set tone mentor`
    Set(Map<String, Value>),
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse a line of input. Returns `None` for ordinary chat input.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "export" => Command::Export,
            "clear" => Command::Clear,
            "personality" => Command::Personality,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "set" => match parse_assignment(args) {
                Some(changes) => Command::Set(changes),
                None => Command::Unknown(input.to_string()),
            },
            _ => Command::Unknown(input.to_string()),
        };

        Some(command)
    }
}

/// Personality fields that hold free text
const TEXT_FIELDS: [&str; 4] = ["tone", "verbosity", "response_style", "voice_name"];

/// `<field> <value>`, where the value is JSON if it parses as JSON.
/// Text fields take the raw text unless it parses as a JSON string.
fn parse_assignment(args: &str) -> Option<Map<String, Value>> {
    let (field, raw) = args.split_once(char::is_whitespace)?;
    let raw = raw.trim();
    if field.is_empty() || raw.is_empty() {
        return None;
    }

    let value = match serde_json::from_str(raw) {
        Ok(Value::String(text)) => Value::String(text),
        Ok(_) if TEXT_FIELDS.contains(&field) => Value::String(raw.to_string()),
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    };

    let mut changes = Map::new();
    changes.insert(field.to_string(), value);
    Some(changes)
}

pub const HELP: &str = "Commands:
  /export                 - Export conversation to JSON
  /clear                  - Clear conversation history
  /personality            - Show the current personality
  /set <field> <value>    - Change a personality field (tone, verbosity, response_style, ...)
  /help                   - Show this list
  /quit                   - Exit Jarvis";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_input_is_not_a_command() {
        assert_eq!(Command::parse("Hello there"), None);
        assert_eq!(Command::parse("what is 1/2?"), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("/export"), Some(Command::Export));
        assert_eq!(Command::parse("  /CLEAR "), Some(Command::Clear));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("/personality"), Some(Command::Personality));
    }

    #[test]
    fn test_set_parses_values() {
        let Some(Command::Set(changes)) = Command::parse("/set tone mentor") else {
            panic!("expected a set command");
        };
        assert_eq!(changes.get("tone"), Some(&Value::from("mentor")));

        let Some(Command::Set(changes)) = Command::parse("/set sound_cues_enabled false") else {
            panic!("expected a set command");
        };
        assert_eq!(changes.get("sound_cues_enabled"), Some(&Value::Bool(false)));

        let Some(Command::Set(changes)) = Command::parse("/set response_style short and witty")
        else {
            panic!("expected a set command");
        };
        assert_eq!(
            changes.get("response_style"),
            Some(&Value::from("short and witty"))
        );
    }

    #[test]
    fn test_set_text_fields_keep_raw_text() {
        let Some(Command::Set(changes)) = Command::parse("/set response_style 42") else {
            panic!("expected a set command");
        };
        assert_eq!(changes.get("response_style"), Some(&Value::from("42")));

        let Some(Command::Set(changes)) = Command::parse("/set voice_name true") else {
            panic!("expected a set command");
        };
        assert_eq!(changes.get("voice_name"), Some(&Value::from("true")));

        let Some(Command::Set(changes)) = Command::parse("/set voice_name \"Alex\"") else {
            panic!("expected a set command");
        };
        assert_eq!(changes.get("voice_name"), Some(&Value::from("Alex")));

        let mut personality = crate::config::PersonalityConfig::default();
        let Some(Command::Set(changes)) = Command::parse("/set response_style null") else {
            panic!("expected a set command");
        };
        assert_eq!(personality.apply_changes(&changes), vec!["response_style".to_string()]);
        assert_eq!(personality.response_style, "null");
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(Command::parse("/set tone"), Some(Command::Unknown(_))));
        assert!(matches!(Command::parse("/dance"), Some(Command::Unknown(_))));
    }
}
