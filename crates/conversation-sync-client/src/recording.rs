//! Recording writer for tests.

use crate::{ConversationSyncError, ConversationWriter, MessageRow, SyncResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory [`ConversationWriter`] that records successful writes and can be
/// told to fail the next N calls.
///
/// Failures surface as a 503 API error, the shape a transient backend outage
/// produces through the real client.
pub struct RecordingWriter {
    conversation_id: String,
    fail_inserts: AtomicUsize,
    fail_batches: AtomicUsize,
    insert_attempts: AtomicUsize,
    batch_attempts: AtomicUsize,
    inserted: Mutex<Vec<MessageRow>>,
    batches: Mutex<Vec<(String, Vec<MessageRow>)>>,
}

impl RecordingWriter {
    /// Create a writer that mints `"conv-1"` on the first successful insert.
    pub fn new() -> Self {
        Self::with_conversation_id("conv-1")
    }

    /// Create a writer minting the given conversation id.
    pub fn with_conversation_id(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            fail_inserts: AtomicUsize::new(0),
            fail_batches: AtomicUsize::new(0),
            insert_attempts: AtomicUsize::new(0),
            batch_attempts: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `n` single-row inserts.
    pub fn fail_next_inserts(&self, n: usize) {
        self.fail_inserts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` batch inserts.
    pub fn fail_next_batches(&self, n: usize) {
        self.fail_batches.store(n, Ordering::SeqCst);
    }

    /// Total single-row insert attempts, including failed ones.
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Total batch insert attempts, including failed ones.
    pub fn batch_attempts(&self) -> usize {
        self.batch_attempts.load(Ordering::SeqCst)
    }

    /// Rows written by successful single-row inserts.
    pub fn inserted(&self) -> Vec<MessageRow> {
        self.inserted.lock().expect("lock poisoned").clone()
    }

    /// Batches written by successful batch inserts, with their conversation id.
    pub fn batches(&self) -> Vec<(String, Vec<MessageRow>)> {
        self.batches.lock().expect("lock poisoned").clone()
    }

    /// Content of every successfully written row, in write order.
    pub fn written_contents(&self) -> Vec<String> {
        let mut contents: Vec<String> = self
            .inserted()
            .into_iter()
            .map(|row| row.content)
            .collect();
        for (_, rows) in self.batches() {
            contents.extend(rows.into_iter().map(|row| row.content));
        }
        contents
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn outage() -> ConversationSyncError {
        ConversationSyncError::Api {
            status: 503,
            message: "simulated outage".to_string(),
        }
    }
}

impl Default for RecordingWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationWriter for RecordingWriter {
    async fn insert_first_message(&self, row: &MessageRow) -> SyncResult<String> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_inserts) {
            return Err(Self::outage());
        }
        self.inserted.lock().expect("lock poisoned").push(row.clone());
        Ok(self.conversation_id.clone())
    }

    async fn insert_batch(&self, conversation_id: &str, rows: &[MessageRow]) -> SyncResult<()> {
        self.batch_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_batches) {
            return Err(Self::outage());
        }
        self.batches
            .lock()
            .expect("lock poisoned")
            .push((conversation_id.to_string(), rows.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_row(content: &str) -> MessageRow {
        MessageRow {
            role: "user".to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn records_successful_writes() {
        let writer = RecordingWriter::with_conversation_id("conv-9");

        let id = writer.insert_first_message(&make_row("hello")).await.unwrap();
        assert_eq!(id, "conv-9");

        writer
            .insert_batch("conv-9", &[make_row("a"), make_row("b")])
            .await
            .unwrap();

        assert_eq!(writer.insert_attempts(), 1);
        assert_eq!(writer.batch_attempts(), 1);
        assert_eq!(writer.written_contents(), vec!["hello", "a", "b"]);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let writer = RecordingWriter::new();
        writer.fail_next_batches(2);

        assert!(writer.insert_batch("conv-1", &[make_row("a")]).await.is_err());
        assert!(writer.insert_batch("conv-1", &[make_row("a")]).await.is_err());
        assert!(writer.insert_batch("conv-1", &[make_row("a")]).await.is_ok());

        assert_eq!(writer.batch_attempts(), 3);
        assert_eq!(writer.batches().len(), 1);
    }

    #[tokio::test]
    async fn failed_inserts_record_no_rows() {
        let writer = RecordingWriter::new();
        writer.fail_next_inserts(1);

        assert!(writer.insert_first_message(&make_row("x")).await.is_err());
        assert!(writer.inserted().is_empty());
        assert_eq!(writer.insert_attempts(), 1);
    }
}
