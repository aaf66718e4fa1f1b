//! Chat engine: one user turn from input to recorded response
//!
//! The ChatEngine sequences a single interaction:
//! 1. Takes a snapshot of the windowed conversation context
//! 2. Builds the request (system prompt, context, new input)
//! 3. Sends it to the generation backend
//! 4. Records the turn in the conversation buffer
//! 5. Returns the response
//!
//! Backend failures never escape `process_input`. The error text becomes the
//! assistant's reply and is recorded like any other turn, so the session log
//! has no gaps.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{build_request, PersonalityConfig};
use crate::conversation::{ConversationBuffer, ConversationExport, Message};
use crate::providers::Generator;

use super::preferences::{PreferenceError, PreferenceStore};

/// Metadata key set on assistant messages that carry a backend error
pub const GENERATION_ERROR_KEY: &str = "generation_error";

/// The core chat engine
pub struct ChatEngine {
    generator: Arc<dyn Generator>,
    preferences: Arc<dyn PreferenceStore>,
    buffer: ConversationBuffer,
    personality: PersonalityConfig,
}

impl ChatEngine {
    /// Create a new chat engine, reading the personality from `preferences`
    pub fn new(
        generator: Arc<dyn Generator>,
        preferences: Arc<dyn PreferenceStore>,
        max_turns: NonZeroUsize,
    ) -> Self {
        let personality = preferences.load().personality();

        tracing::info!(
            tone = personality.tone.as_str(),
            verbosity = personality.verbosity.as_str(),
            max_turns = max_turns.get(),
            "Chat engine ready"
        );

        Self {
            generator,
            preferences,
            buffer: ConversationBuffer::new(max_turns),
            personality,
        }
    }

    /// Run one interaction and return the assistant's reply
    pub async fn process_input(&mut self, user_input: &str) -> String {
        let messages = build_request(
            user_input,
            self.buffer.get_context(),
            Some(&self.personality),
        );

        let (response, assistant_message) = match self.generator.generate(&messages).await {
            Ok(text) => (text.clone(), Message::assistant(text)),
            Err(e) => {
                tracing::warn!(
                    backend = self.generator.name(),
                    kind = e.kind(),
                    error = %e,
                    "Generation failed"
                );
                let text = format!("I encountered an error: {}", e);
                let message = Message::assistant(text.clone())
                    .with_metadata(GENERATION_ERROR_KEY, e.kind());
                (text, message)
            }
        };

        self.buffer
            .add_turn(Message::user(user_input), assistant_message);

        response
    }

    /// Update personality fields by name and persist the result.
    ///
    /// Unknown names are ignored. Returns the fields that changed. The engine
    /// keeps its current personality if the store rejects the write.
    pub fn update_personality(
        &mut self,
        changes: &Map<String, Value>,
    ) -> Result<Vec<String>, PreferenceError> {
        let mut personality = self.personality.clone();
        let applied = personality.apply_changes(changes);

        let mut document = self.preferences.load();
        document.merge_personality(&personality, &applied)?;
        self.preferences.save(&document)?;

        self.personality = personality;
        tracing::info!(fields = ?applied, "Personality updated");
        Ok(applied)
    }

    pub fn personality(&self) -> &PersonalityConfig {
        &self.personality
    }

    pub fn conversation(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn export_conversation(&self) -> ConversationExport {
        self.buffer.export()
    }

    pub fn clear_conversation(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Tone, Verbosity};
    use crate::conversation::{PromptMessage, Role};
    use crate::core::preferences::{InMemoryStore, Preferences};
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a canned answer and remembers every request it saw
    #[derive(Default)]
    struct RecordingGenerator {
        requests: Mutex<Vec<Vec<PromptMessage>>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<Vec<PromptMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, messages: &[PromptMessage]) -> Result<String, ProviderError> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            if self.fail {
                return Err(ProviderError::Unavailable(
                    "Cannot connect to Ollama at http://localhost:11434".to_string(),
                ));
            }
            Ok(format!("Reply {}", requests.len()))
        }
    }

    fn engine(
        generator: Arc<RecordingGenerator>,
        store: Arc<InMemoryStore>,
        max_turns: usize,
    ) -> ChatEngine {
        ChatEngine::new(generator, store, NonZeroUsize::new(max_turns).unwrap())
    }

    #[tokio::test]
    async fn test_process_input_records_turn() {
        let generator = Arc::new(RecordingGenerator::default());
        let mut engine = engine(generator.clone(), Arc::new(InMemoryStore::default()), 10);

        let response = engine.process_input("Hello").await;

        assert_eq!(response, "Reply 1");
        assert_eq!(engine.conversation().size(), 1);
        let turn = engine.conversation().turns().next().unwrap();
        assert_eq!(turn.user_message.content(), "Hello");
        assert_eq!(turn.assistant_message.content(), "Reply 1");
        assert!(turn.assistant_message.metadata().is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_system_prompt_and_history() {
        let generator = Arc::new(RecordingGenerator::default());
        let mut engine = engine(generator.clone(), Arc::new(InMemoryStore::default()), 10);

        engine.process_input("First").await;
        engine.process_input("Second").await;

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);

        let first = &requests[0];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, Role::System);
        assert_eq!(
            first[0].content,
            "You are a helpful and professional assistant. \
             Balance brevity with necessary detail. helpful and informative"
        );

        let second = &requests[1];
        let contents: Vec<&str> = second.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[1..], ["First", "Reply 1", "Second"]);
        assert_eq!(second.last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_backend_failure_is_recorded() {
        let generator = Arc::new(RecordingGenerator::failing());
        let mut engine = engine(generator, Arc::new(InMemoryStore::default()), 10);

        let response = engine.process_input("Are you there?").await;

        assert!(!response.is_empty());
        assert!(response.contains("Cannot connect"));
        assert_eq!(engine.conversation().size(), 1);

        let turn = engine.conversation().turns().next().unwrap();
        assert_eq!(turn.assistant_message.content(), response);
        assert_eq!(
            turn.assistant_message.metadata().get(GENERATION_ERROR_KEY),
            Some(&Value::from("unavailable"))
        );
    }

    #[test]
    fn test_context_window_is_bounded() {
        let generator = Arc::new(RecordingGenerator::default());
        let mut engine = engine(generator.clone(), Arc::new(InMemoryStore::default()), 2);

        tokio_test::block_on(async {
            for i in 0..4 {
                engine.process_input(&format!("Message {}", i)).await;
            }
        });

        assert_eq!(engine.conversation().size(), 2);
        let last_request = generator.requests().pop().unwrap();
        // system + two retained turns + new input
        assert_eq!(last_request.len(), 6);
        assert_eq!(last_request[1].content, "Message 1");
    }

    #[test]
    fn test_personality_loaded_from_store() {
        let mut prefs = Preferences::default();
        prefs
            .set_personality(&PersonalityConfig {
                tone: Tone::Mentor,
                ..PersonalityConfig::default()
            })
            .unwrap();
        let store = Arc::new(InMemoryStore::with(prefs));

        let engine = engine(Arc::new(RecordingGenerator::default()), store, 5);
        assert_eq!(engine.personality().tone, Tone::Mentor);
    }

    #[test]
    fn test_update_personality_writes_through() {
        let mut prefs = Preferences::default();
        prefs.insert("wake_word", Value::from("Hey Computer"));
        let store = Arc::new(InMemoryStore::with(prefs));
        let mut engine = engine(Arc::new(RecordingGenerator::default()), store.clone(), 5);

        let changes = json!({ "verbosity": "detailed", "mood": "cheerful" });
        let applied = engine
            .update_personality(changes.as_object().unwrap())
            .unwrap();

        assert_eq!(applied, vec!["verbosity".to_string()]);
        assert_eq!(engine.personality().verbosity, Verbosity::Detailed);
        assert_eq!(store.save_count(), 1);

        let saved = store.load();
        assert_eq!(saved.personality().verbosity, Verbosity::Detailed);
        assert_eq!(saved.get("wake_word"), Some(&Value::from("Hey Computer")));
        assert!(saved.get("personality").unwrap().get("mood").is_none());
    }

    #[test]
    fn test_update_with_only_unknown_fields_still_persists() {
        let store = Arc::new(InMemoryStore::default());
        let mut engine = engine(Arc::new(RecordingGenerator::default()), store.clone(), 5);

        let applied = engine
            .update_personality(json!({ "accent": "scottish" }).as_object().unwrap())
            .unwrap();

        assert!(applied.is_empty());
        assert_eq!(engine.personality(), &PersonalityConfig::default());
        assert_eq!(store.save_count(), 1);
    }

    /// Serves a fixed document and refuses every write
    struct ReadOnlyStore(Preferences);

    impl PreferenceStore for ReadOnlyStore {
        fn load(&self) -> Preferences {
            self.0.clone()
        }

        fn save(&self, _preferences: &Preferences) -> Result<(), PreferenceError> {
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into())
        }
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_personality() {
        let generator = Arc::new(RecordingGenerator::default());
        let store = Arc::new(ReadOnlyStore(Preferences::default()));
        let mut engine = ChatEngine::new(generator.clone(), store.clone(), NonZeroUsize::MIN);

        let result = engine.update_personality(json!({ "tone": "mentor" }).as_object().unwrap());

        assert!(matches!(result, Err(PreferenceError::Io(_))));
        assert_eq!(engine.personality(), &PersonalityConfig::default());
        assert_eq!(store.load().personality().tone, Tone::Neutral);

        engine.process_input("Hello").await;
        let request = generator.requests().pop().unwrap();
        assert!(request[0].content.starts_with("You are a helpful and professional assistant."));
    }

    #[test]
    fn test_unrelated_update_keeps_unknown_stored_tone() {
        let prefs: Preferences = serde_json::from_value(json!({
            "personality": { "tone": "grumpy", "verbosity": "detailed" },
        }))
        .unwrap();
        let store = Arc::new(InMemoryStore::with(prefs));
        let mut engine = engine(Arc::new(RecordingGenerator::default()), store.clone(), 5);
        assert_eq!(engine.personality().tone, Tone::Neutral);

        engine
            .update_personality(json!({ "voice_name": "Daniel" }).as_object().unwrap())
            .unwrap();

        let saved = store.load();
        let section = saved.get("personality").unwrap();
        assert_eq!(section["tone"], "grumpy");
        assert_eq!(section["verbosity"], "detailed");
        assert_eq!(section["voice_name"], "Daniel");
        assert_eq!(engine.personality().voice_name, "Daniel");
    }

    #[tokio::test]
    async fn test_export_and_clear() {
        let mut engine = engine(
            Arc::new(RecordingGenerator::default()),
            Arc::new(InMemoryStore::default()),
            5,
        );
        engine.process_input("Test").await;

        let export = engine.export_conversation();
        assert_eq!(export.turns.len(), 1);
        assert_eq!(export.turns[0].user_message.content, "Test");
        assert_eq!(export.max_turns, 5);

        engine.clear_conversation();
        assert_eq!(engine.conversation().size(), 0);
        assert_ne!(engine.export_conversation().session_id, export.session_id);
    }
}
