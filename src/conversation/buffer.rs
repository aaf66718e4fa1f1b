//! Bounded, in-memory conversation history
//!
//! The buffer keeps at most `capacity` turns. Appending past that drops the
//! oldest turn first, so the context handed to the model is always the most
//! recent stretch of the session, in the order it happened.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConversationTurn, Message, Metadata, PromptMessage, Role};

/// Fixed-capacity FIFO of conversation turns for one session
#[derive(Debug)]
pub struct ConversationBuffer {
    capacity: NonZeroUsize,
    turns: VecDeque<ConversationTurn>,
    session_id: Uuid,
    started_at: DateTime<Utc>,
}

impl ConversationBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity.get()),
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Record a full exchange, evicting from the front if over capacity
    pub fn add_turn(&mut self, user_message: Message, assistant_message: Message) {
        self.turns
            .push_back(ConversationTurn::new(user_message, assistant_message));

        let mut evicted = 0;
        while self.turns.len() > self.capacity.get() {
            self.turns.pop_front();
            evicted += 1;
        }

        tracing::debug!(
            session_id = %self.session_id,
            turns = self.turns.len(),
            evicted,
            "Recorded conversation turn"
        );
    }

    /// Role/content pairs for every retained message, oldest first.
    ///
    /// The iterator is a projection: it yields copies, and it can be cloned to
    /// walk the same context again.
    pub fn get_context(&self) -> impl Iterator<Item = PromptMessage> + Clone + '_ {
        self.turns.iter().flat_map(|turn| {
            [
                PromptMessage::from(&turn.user_message),
                PromptMessage::from(&turn.assistant_message),
            ]
        })
    }

    /// Snapshot of the whole session suitable for serialization
    pub fn export(&self) -> ConversationExport {
        ConversationExport {
            session_id: self.session_id.to_string(),
            started_at: format_instant(self.started_at),
            max_turns: self.capacity.get(),
            turns: self
                .turns
                .iter()
                .map(|turn| ExportedTurn {
                    user_message: ExportedMessage::from(&turn.user_message),
                    assistant_message: ExportedMessage::from(&turn.assistant_message),
                })
                .collect(),
        }
    }

    /// Drop all history and start a new session
    pub fn clear(&mut self) {
        let previous = self.session_id;
        self.turns.clear();
        self.session_id = Uuid::new_v4();
        self.started_at = Utc::now();

        tracing::info!(%previous, session_id = %self.session_id, "Conversation cleared");
    }

    pub fn size(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[cfg(test)]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Read-only view of the retained turns, oldest first
    #[cfg(test)]
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serialized form of a [`ConversationBuffer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub session_id: String,
    /// ISO-8601, UTC
    pub started_at: String,
    pub max_turns: usize,
    pub turns: Vec<ExportedTurn>,
}

impl ConversationExport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTurn {
    pub user_message: ExportedMessage,
    pub assistant_message: ExportedMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub role: Role,
    pub content: String,
    /// ISO-8601, UTC
    pub timestamp: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&Message> for ExportedMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
            timestamp: format_instant(message.timestamp()),
            metadata: message.metadata().clone(),
        }
    }
}
