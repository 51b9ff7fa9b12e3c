//! Ordered message log for the active session.
//!
//! The log lives behind an [`Arc`] so [`ConversationStore::snapshot`] hands out
//! a cheap immutable view. [`ConversationStore::replace_all`] swaps the whole
//! `Arc`, so a reader holds either the old log or the new one, never a mix.

use crate::types::{ChatMessage, Role};
use std::sync::Arc;
use time::OffsetDateTime;

/// Immutable view of the log at the moment it was taken.
pub type Snapshot = Arc<Vec<ChatMessage>>;

const TRANSCRIPT_SEPARATOR: &str = "\n---\n\n";

#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    messages: Snapshot,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        // Copies only when a snapshot of the current log is still alive.
        Arc::make_mut(&mut self.messages).push(message);
    }

    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages = Arc::new(messages);
    }

    pub fn clear(&mut self) {
        self.messages = Arc::new(Vec::new());
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    // ============================================
    // Export
    // ============================================

    /// Plain-text transcript, or `None` when there is nothing to export.
    pub fn export_transcript(&self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        let blocks: Vec<String> = self
            .messages
            .iter()
            .map(|msg| {
                let speaker = match msg.role {
                    Role::User => "You",
                    Role::Assistant => "Assistant",
                };
                format!("{speaker}:\n{}\n", msg.content)
            })
            .collect();
        Some(blocks.join(TRANSCRIPT_SEPARATOR))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self.messages.as_ref())
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let messages: Vec<ChatMessage> = serde_json::from_str(raw)?;
        Ok(Self {
            messages: Arc::new(messages),
        })
    }
}

/// `chat-history-<first 8 chars of session id>-<unix millis>.txt`
pub fn export_file_name(session_id: &str, at: OffsetDateTime) -> String {
    let prefix: String = session_id.chars().take(8).collect();
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("chat-history-{prefix}-{millis}.txt")
}
