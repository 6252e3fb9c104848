//! The writer trait consumed by the delivery queue.

use crate::SyncResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single message row as the conversation store expects it.
///
/// The exact schema is owned by the backend; the queue only fills in role,
/// content, and creation time. `conversation_id` is absent on the first
/// insert (the backend mints one) and set by the client on batch inserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    /// Message author role: "user" or "assistant".
    pub role: String,
    /// Text payload.
    pub content: String,
    /// Client-side creation time.
    pub timestamp: DateTime<Utc>,
    /// Conversation this row belongs to, if already established.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Trait for writing chat messages to the remote conversation store.
///
/// Implementors handle transport and authentication. Both operations are
/// all-or-nothing per call: there is no partial-batch success.
#[async_trait]
pub trait ConversationWriter: Send + Sync {
    /// Inserts a single row with no conversation id and returns the
    /// server-minted conversation id.
    async fn insert_first_message(&self, row: &MessageRow) -> SyncResult<String>;

    /// Inserts a batch of rows tagged with a known conversation id.
    async fn insert_batch(&self, conversation_id: &str, rows: &[MessageRow]) -> SyncResult<()>;
}
