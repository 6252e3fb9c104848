//! HTTP client for the conversation store REST API.

use crate::{ConversationSyncError, ConversationWriter, MessageRow, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Request timeout for conversation store calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Table receiving chat messages.
const MESSAGES_TABLE: &str = "conversation_messages";

/// Row shape returned by an insert with `return=representation`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedRow {
    conversation_id: String,
}

/// HTTP client for the managed conversation store.
///
/// Holds the API base URL, the anonymous API key, and an optional bearer
/// token that can be replaced at runtime (e.g., after a token refresh).
pub struct ConversationApiClient {
    api_url: String,
    api_key: String,
    auth_token: RwLock<Option<String>>,
    client: Client,
}

impl ConversationApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_url` - Backend API base URL (e.g., `https://xxx.supabase.co`)
    /// * `api_key` - Anonymous API key
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            auth_token: RwLock::new(None),
            client,
        }
    }

    /// Replace the bearer token used for authenticated writes.
    pub fn set_auth_token(&self, token: &str) {
        *self.auth_token.write().expect("lock poisoned") = Some(token.to_string());
    }

    /// Clear the bearer token (e.g., on logout).
    pub fn clear_auth_token(&self) {
        *self.auth_token.write().expect("lock poisoned") = None;
    }

    fn bearer(&self) -> String {
        self.auth_token
            .read()
            .expect("lock poisoned")
            .clone()
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn messages_url(&self) -> String {
        format!("{}/rest/v1/{}", self.api_url, MESSAGES_TABLE)
    }
}

#[async_trait]
impl ConversationWriter for ConversationApiClient {
    async fn insert_first_message(&self, row: &MessageRow) -> SyncResult<String> {
        let url = self.messages_url();
        debug!(url = %url, "inserting first message");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConversationSyncError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<InsertedRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(|r| r.conversation_id)
            .ok_or_else(|| ConversationSyncError::Api {
                status: status.as_u16(),
                message: "insert response contained no rows".to_string(),
            })
    }

    async fn insert_batch(&self, conversation_id: &str, rows: &[MessageRow]) -> SyncResult<()> {
        let url = self.messages_url();
        let tagged: Vec<MessageRow> = rows
            .iter()
            .map(|row| MessageRow {
                conversation_id: Some(conversation_id.to_string()),
                ..row.clone()
            })
            .collect();

        debug!(url = %url, conversation_id = %conversation_id, rows = tagged.len(), "inserting batch");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .header("Prefer", "return=minimal")
            .json(&tagged)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConversationSyncError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for ConversationApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationApiClient").finish_non_exhaustive()
    }
}
