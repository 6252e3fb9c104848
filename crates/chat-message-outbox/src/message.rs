//! Queue data model.

use chrono::{DateTime, Utc};
use conversation_sync_client::MessageRow;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Wire representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message waiting for delivery.
///
/// `id` is generated client-side at enqueue time and never changes; it is
/// unique across the live buffer and the dead-letter list combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    /// Globally unique id, generated at enqueue time.
    pub id: String,
    /// Message author.
    pub role: MessageRole,
    /// Text payload. Length is bounded upstream by the composer.
    pub content: String,
    /// Creation time, client clock.
    pub timestamp: DateTime<Utc>,
    /// Failed flush attempts so far.
    pub attempts: u32,
}

impl PendingMessage {
    /// Build a fresh message with zero attempts.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attempts: 0,
        }
    }

    /// The row shape the remote writer expects.
    pub fn to_row(&self) -> MessageRow {
        MessageRow {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
            timestamp: self.timestamp,
            conversation_id: None,
        }
    }
}

/// A message that exhausted its retry budget.
///
/// Created only by the flush engine; removed by explicit user retry or
/// deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Attempt count at the moment delivery was given up.
    pub attempts: u32,
}

impl DeadLetterEntry {
    /// Convert back into a pending message with a fresh retry budget.
    ///
    /// Id, role, content, and timestamp are preserved; attempts reset to 0.
    pub fn into_retry(self) -> PendingMessage {
        PendingMessage {
            id: self.id,
            role: self.role,
            content: self.content,
            timestamp: self.timestamp,
            attempts: 0,
        }
    }
}

impl From<PendingMessage> for DeadLetterEntry {
    fn from(message: PendingMessage) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            timestamp: message.timestamp,
            attempts: message.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_starts_with_zero_attempts() {
        let msg = PendingMessage::new(MessageRole::User, "hello");
        assert_eq!(msg.attempts, 0);
        assert_eq!(msg.content, "hello");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let a = PendingMessage::new(MessageRole::User, "x");
        let b = PendingMessage::new(MessageRole::User, "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn to_row_carries_no_conversation_id() {
        let msg = PendingMessage::new(MessageRole::Assistant, "answer");
        let row = msg.to_row();
        assert_eq!(row.role, "assistant");
        assert_eq!(row.content, "answer");
        assert!(row.conversation_id.is_none());
    }

    #[test]
    fn dead_letter_retry_resets_attempts_and_keeps_identity() {
        let mut msg = PendingMessage::new(MessageRole::User, "stuck");
        msg.attempts = 6;
        let id = msg.id.clone();
        let ts = msg.timestamp;

        let entry = DeadLetterEntry::from(msg);
        assert_eq!(entry.attempts, 6);

        let retried = entry.into_retry();
        assert_eq!(retried.id, id);
        assert_eq!(retried.timestamp, ts);
        assert_eq!(retried.attempts, 0);
        assert_eq!(retried.content, "stuck");
    }

    #[test]
    fn pending_message_serde_roundtrip() {
        let msg = PendingMessage::new(MessageRole::User, "hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: PendingMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
