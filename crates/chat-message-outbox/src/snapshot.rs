//! Snapshot serialization for the durable state store.
//!
//! The queue persists its full state under two keys: one document for the
//! pending buffer plus the conversation id, one for the dead-letter list.
//! Any save failure is logged by the caller and treated as non-fatal; the
//! in-memory state stays authoritative until the next successful save.

use crate::{DeadLetterEntry, OutboxResult, PendingMessage};
use outbox_snapshot_store::SnapshotStorage;
use serde::{Deserialize, Serialize};

/// Storage keys used by the outbox.
pub struct SnapshotKeys;

impl SnapshotKeys {
    /// Pending buffer and conversation id.
    pub const PENDING: &'static str = "chat_outbox.pending";
    /// Dead-letter list.
    pub const DEAD_LETTERS: &'static str = "chat_outbox.dead_letters";
}

/// The unit of persistence: everything needed to resume after a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub pending: Vec<PendingMessage>,
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub dead_letters: Vec<DeadLetterEntry>,
}

/// Document stored under [`SnapshotKeys::PENDING`].
#[derive(Serialize, Deserialize)]
struct PendingDoc {
    pending: Vec<PendingMessage>,
    conversation_id: Option<String>,
}

/// Write the snapshot to the store, both keys.
pub(crate) fn save_snapshot(
    store: &dyn SnapshotStorage,
    snapshot: &QueueSnapshot,
) -> OutboxResult<()> {
    let pending_doc = serde_json::to_string(&PendingDoc {
        pending: snapshot.pending.clone(),
        conversation_id: snapshot.conversation_id.clone(),
    })?;
    store.set(SnapshotKeys::PENDING, &pending_doc)?;

    let dead_doc = serde_json::to_string(&snapshot.dead_letters)?;
    store.set(SnapshotKeys::DEAD_LETTERS, &dead_doc)?;
    Ok(())
}

/// Read the last snapshot from the store. Missing keys read as empty state.
pub(crate) fn load_snapshot(store: &dyn SnapshotStorage) -> OutboxResult<QueueSnapshot> {
    let mut snapshot = QueueSnapshot::default();

    if let Some(raw) = store.get(SnapshotKeys::PENDING)? {
        let doc: PendingDoc = serde_json::from_str(&raw)?;
        snapshot.pending = doc.pending;
        snapshot.conversation_id = doc.conversation_id;
    }
    if let Some(raw) = store.get(SnapshotKeys::DEAD_LETTERS)? {
        snapshot.dead_letters = serde_json::from_str(&raw)?;
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use outbox_snapshot_store::MemorySnapshotStore;

    #[test]
    fn roundtrip_through_memory_store() {
        let store = MemorySnapshotStore::new();
        let mut failed = PendingMessage::new(MessageRole::Assistant, "retry me");
        failed.attempts = 2;
        let snapshot = QueueSnapshot {
            pending: vec![PendingMessage::new(MessageRole::User, "hello"), failed],
            conversation_id: Some("conv-7".to_string()),
            dead_letters: vec![DeadLetterEntry {
                id: "dead-1".to_string(),
                role: MessageRole::User,
                content: "gave up".to_string(),
                timestamp: chrono::Utc::now(),
                attempts: 6,
            }],
        };

        save_snapshot(&store, &snapshot).unwrap();
        let restored = load_snapshot(&store).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn empty_store_loads_default() {
        let store = MemorySnapshotStore::new();
        let restored = load_snapshot(&store).unwrap();
        assert!(restored.pending.is_empty());
        assert!(restored.conversation_id.is_none());
        assert!(restored.dead_letters.is_empty());
    }

    #[test]
    fn corrupted_document_is_an_error() {
        let store = MemorySnapshotStore::new();
        store.set(SnapshotKeys::PENDING, "not json").unwrap();
        assert!(load_snapshot(&store).is_err());
    }

    #[test]
    fn missing_dead_letter_key_loads_pending_only() {
        let store = MemorySnapshotStore::new();
        let snapshot = QueueSnapshot {
            pending: vec![PendingMessage::new(MessageRole::User, "a")],
            conversation_id: Some("conv-1".to_string()),
            dead_letters: vec![],
        };
        save_snapshot(&store, &snapshot).unwrap();
        store.delete(SnapshotKeys::DEAD_LETTERS).unwrap();

        let restored = load_snapshot(&store).unwrap();
        assert_eq!(restored.pending.len(), 1);
        assert_eq!(restored.conversation_id.as_deref(), Some("conv-1"));
        assert!(restored.dead_letters.is_empty());
    }
}
