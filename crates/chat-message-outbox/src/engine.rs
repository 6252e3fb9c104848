//! The flush engine.
//!
//! Owns the in-memory queue state and executes single-flight flush attempts:
//! the session-assignment insert when no conversation id exists yet, then the
//! batch path for everything else. The `flushing` flag on [`QueueState`] is
//! the sole concurrency-control primitive; it stays set across the awaited
//! writer calls while the mutex itself is never held across an await.

use crate::config::{backoff_delay, OutboxConfig};
use crate::message::{DeadLetterEntry, PendingMessage};
use crate::snapshot::{save_snapshot, QueueSnapshot};
use conversation_sync_client::{ConversationWriter, MessageRow};
use outbox_snapshot_store::SnapshotStorage;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// In-memory queue state, mutated only by the flush engine and the facade.
pub(crate) struct QueueState {
    pub(crate) pending: VecDeque<PendingMessage>,
    pub(crate) conversation_id: Option<String>,
    pub(crate) dead_letters: Vec<DeadLetterEntry>,
    pub(crate) flushing: bool,
}

impl QueueState {
    pub(crate) fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            conversation_id: None,
            dead_letters: Vec::new(),
            flushing: false,
        }
    }

    pub(crate) fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.iter().cloned().collect(),
            conversation_id: self.conversation_id.clone(),
            dead_letters: self.dead_letters.clone(),
        }
    }
}

/// Result of a flush attempt, driving the worker loop's retry timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushOutcome {
    /// A flush was already in progress; nothing was done.
    Skipped,
    /// The attempt finished without scheduling a retry.
    Clean,
    /// The attempt failed; retry after this delay. Supersedes any previously
    /// scheduled retry.
    Retry(Duration),
}

/// Persist the current state, logging failures as non-fatal.
pub(crate) fn persist(state: &QueueState, store: &dyn SnapshotStorage) {
    if let Err(err) = save_snapshot(store, &state.snapshot()) {
        warn!(error = %err, "snapshot save failed; in-memory state remains authoritative");
    }
}

/// Execute one flush attempt.
///
/// Rejected at entry if a flush is already in flight. An empty buffer still
/// persists the current snapshot. Failed messages are re-buffered at the
/// front with an incremented attempt count, or moved to the dead-letter list
/// once they exceed `max_attempts`.
pub(crate) async fn flush_once(
    state: &Mutex<QueueState>,
    writer: &dyn ConversationWriter,
    store: &dyn SnapshotStorage,
    config: &OutboxConfig,
) -> FlushOutcome {
    {
        let mut guard = state.lock().await;
        if guard.flushing {
            debug!("flush already in progress, skipping");
            return FlushOutcome::Skipped;
        }
        guard.flushing = true;
    }

    let conversation_id = { state.lock().await.conversation_id.clone() };

    let conversation_id = match conversation_id {
        Some(id) => Some(id),
        None => match establish_conversation(state, writer, store, config).await {
            Established::Yes(id) => Some(id),
            Established::EmptyBuffer => None,
            Established::Failed(outcome) => return outcome,
        },
    };

    let drained: Vec<PendingMessage> = {
        let mut guard = state.lock().await;
        guard.pending.drain(..).collect()
    };

    let Some(conversation_id) = conversation_id else {
        // No conversation and nothing buffered: persist for crash-safety
        // symmetry and go back to idle.
        let mut guard = state.lock().await;
        guard.flushing = false;
        persist(&guard, store);
        return FlushOutcome::Clean;
    };

    if drained.is_empty() {
        let mut guard = state.lock().await;
        guard.flushing = false;
        persist(&guard, store);
        return FlushOutcome::Clean;
    }

    let rows: Vec<MessageRow> = drained.iter().map(PendingMessage::to_row).collect();

    match writer.insert_batch(&conversation_id, &rows).await {
        Ok(()) => {
            let mut guard = state.lock().await;
            guard.flushing = false;
            persist(&guard, store);
            debug!(
                conversation_id = %conversation_id,
                delivered = rows.len(),
                "batch delivered"
            );
            FlushOutcome::Clean
        }
        Err(err) => {
            warn!(
                conversation_id = %conversation_id,
                rows = rows.len(),
                error = %err,
                "batch insert failed"
            );

            let mut requeue: Vec<PendingMessage> = Vec::new();
            let mut exhausted: Vec<DeadLetterEntry> = Vec::new();
            for mut message in drained {
                message.attempts += 1;
                if message.attempts > config.max_attempts {
                    exhausted.push(DeadLetterEntry::from(message));
                } else {
                    requeue.push(message);
                }
            }

            let mut guard = state.lock().await;
            let max_attempts_requeued = requeue.iter().map(|m| m.attempts).max().unwrap_or(0);
            // Re-buffered messages go ahead of anything enqueued during the
            // failed attempt, preserving their original relative order.
            for message in requeue.into_iter().rev() {
                guard.pending.push_front(message);
            }
            if !exhausted.is_empty() {
                info!(count = exhausted.len(), "messages moved to dead letters");
                guard.dead_letters.splice(0..0, exhausted);
            }
            guard.flushing = false;
            persist(&guard, store);

            if max_attempts_requeued > 0 {
                FlushOutcome::Retry(backoff_delay(max_attempts_requeued, config))
            } else {
                FlushOutcome::Clean
            }
        }
    }
}

enum Established {
    Yes(String),
    EmptyBuffer,
    Failed(FlushOutcome),
}

/// Session-assignment protocol: insert exactly the first buffered message as
/// a single row and adopt the conversation id the store mints for it.
///
/// On failure only that message is re-buffered at the front (or
/// dead-lettered once over budget) and the whole flush attempt aborts
/// without touching the rest of the buffer.
async fn establish_conversation(
    state: &Mutex<QueueState>,
    writer: &dyn ConversationWriter,
    store: &dyn SnapshotStorage,
    config: &OutboxConfig,
) -> Established {
    let first = { state.lock().await.pending.pop_front() };
    let Some(mut message) = first else {
        return Established::EmptyBuffer;
    };

    let row = message.to_row();
    match writer.insert_first_message(&row).await {
        Ok(id) => {
            let mut guard = state.lock().await;
            guard.conversation_id = Some(id.clone());
            info!(conversation_id = %id, "conversation established");
            Established::Yes(id)
        }
        Err(err) => {
            message.attempts += 1;
            warn!(
                message_id = %message.id,
                attempts = message.attempts,
                error = %err,
                "first insert failed"
            );

            let mut guard = state.lock().await;
            let outcome = if message.attempts > config.max_attempts {
                guard.dead_letters.insert(0, DeadLetterEntry::from(message));
                FlushOutcome::Clean
            } else {
                let delay = backoff_delay(message.attempts, config);
                guard.pending.push_front(message);
                FlushOutcome::Retry(delay)
            };
            guard.flushing = false;
            persist(&guard, store);
            Established::Failed(outcome)
        }
    }
}
