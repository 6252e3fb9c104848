//! The queue facade and its worker loop.

use crate::config::OutboxConfig;
use crate::engine::{flush_once, persist, FlushOutcome, QueueState};
use crate::message::{DeadLetterEntry, MessageRole, PendingMessage};
use crate::snapshot::{load_snapshot, QueueSnapshot};
use conversation_sync_client::ConversationWriter;
use outbox_snapshot_store::SnapshotStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Capacity of the worker signal channel.
const SIGNAL_QUEUE_CAPACITY: usize = 64;

enum OutboxSignal {
    /// Flush immediately instead of waiting for the next periodic tick.
    FlushNow,
    /// Run one final best-effort flush, ack, and stop.
    Shutdown(oneshot::Sender<()>),
}

/// Persisted, retrying delivery queue for outgoing chat messages.
///
/// The only entry point used by the surrounding UI. Construct with
/// [`ChatOutbox::new`], restore persisted state with [`ChatOutbox::load`],
/// then [`ChatOutbox::start`] the worker. Each instance is independent;
/// nothing here is global.
///
/// # Lifecycle
///
/// 1. `new()` with the remote writer and snapshot store
/// 2. `load()` to restore the last persisted snapshot
/// 3. `start()` to spawn the background worker (once)
/// 4. `enqueue()` from the UI; returns without waiting for delivery
/// 5. `shutdown()` on teardown; optionally await the returned receiver
pub struct ChatOutbox {
    config: OutboxConfig,
    state: Arc<Mutex<QueueState>>,
    writer: Arc<dyn ConversationWriter>,
    store: Arc<dyn SnapshotStorage>,
    signal_tx: mpsc::Sender<OutboxSignal>,
    signal_rx: std::sync::Mutex<Option<mpsc::Receiver<OutboxSignal>>>,
}

impl ChatOutbox {
    /// Create a new outbox with its collaborators.
    pub fn new(
        config: OutboxConfig,
        writer: Arc<dyn ConversationWriter>,
        store: Arc<dyn SnapshotStorage>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);
        Self {
            config,
            state: Arc::new(Mutex::new(QueueState::new())),
            writer,
            store,
            signal_tx,
            signal_rx: std::sync::Mutex::new(Some(signal_rx)),
        }
    }

    /// Restore the last persisted snapshot into the queue.
    ///
    /// A missing or unreadable snapshot yields an empty queue with a warning,
    /// never an error. Idempotent; call once at startup before [`start`].
    ///
    /// [`start`]: Self::start
    pub async fn load(&self) {
        let snapshot = match load_snapshot(self.store.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "failed to restore queue snapshot, starting empty");
                QueueSnapshot::default()
            }
        };

        let mut guard = self.state.lock().await;
        info!(
            pending = snapshot.pending.len(),
            dead_letters = snapshot.dead_letters.len(),
            conversation_established = snapshot.conversation_id.is_some(),
            "queue state restored"
        );
        guard.pending = snapshot.pending.into();
        guard.conversation_id = snapshot.conversation_id;
        guard.dead_letters = snapshot.dead_letters;
    }

    /// Spawn the background worker loop.
    ///
    /// The loop selects over the signal channel, a periodic flush ticker
    /// (skipped while the buffer is empty), and a resettable retry deadline.
    /// A newly scheduled retry supersedes any previous one.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn start(&self) {
        let mut receiver = self
            .signal_rx
            .lock()
            .expect("lock poisoned")
            .take()
            .expect("ChatOutbox already started");

        let config = self.config.clone();
        let state = self.state.clone();
        let writer = self.writer.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            let mut ticker = interval(config.flush_interval);
            let mut retry_at: Option<Instant> = None;

            loop {
                tokio::select! {
                    maybe_signal = receiver.recv() => {
                        match maybe_signal {
                            Some(OutboxSignal::FlushNow) => {
                                let outcome = flush_once(
                                    &state, writer.as_ref(), store.as_ref(), &config,
                                ).await;
                                apply_outcome(&mut retry_at, outcome);
                            }
                            Some(OutboxSignal::Shutdown(ack)) => {
                                let _ = flush_once(
                                    &state, writer.as_ref(), store.as_ref(), &config,
                                ).await;
                                let _ = ack.send(());
                                debug!("outbox worker stopped");
                                break;
                            }
                            None => {
                                debug!("outbox worker stopped (channel closed)");
                                break;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        if state.lock().await.pending.is_empty() {
                            continue;
                        }
                        let outcome = flush_once(
                            &state, writer.as_ref(), store.as_ref(), &config,
                        ).await;
                        apply_outcome(&mut retry_at, outcome);
                    }
                    _ = sleep_until(retry_deadline(retry_at)), if retry_at.is_some() => {
                        retry_at = None;
                        let outcome = flush_once(
                            &state, writer.as_ref(), store.as_ref(), &config,
                        ).await;
                        apply_outcome(&mut retry_at, outcome);
                    }
                }
            }
        });
    }

    /// Append a message to the queue and return its generated id.
    ///
    /// Persists immediately and returns without waiting for remote delivery.
    /// If no conversation id is known yet, a forced flush is signalled so one
    /// is established as early as possible.
    pub async fn enqueue(&self, role: MessageRole, content: impl Into<String>) -> String {
        let message = PendingMessage::new(role, content);
        let id = message.id.clone();

        let needs_conversation = {
            let mut guard = self.state.lock().await;
            guard.pending.push_back(message);
            persist(&guard, self.store.as_ref());
            guard.conversation_id.is_none()
        };

        debug!(message_id = %id, "message enqueued");
        if needs_conversation {
            self.signal_flush_now();
        }
        id
    }

    /// Stop the worker after one final best-effort flush.
    ///
    /// Returns a receiver acked once the final flush finished. Dropping it
    /// gives fire-and-forget teardown; awaiting it gives a completion signal.
    /// Shutdown does not guarantee delivery of still-failing messages.
    pub fn shutdown(&self) -> oneshot::Receiver<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if let Err(err) = self.signal_tx.try_send(OutboxSignal::Shutdown(ack_tx)) {
            warn!(error = %err, "shutdown signal could not be delivered");
        }
        ack_rx
    }

    /// Number of messages waiting for delivery.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// The established conversation id, if any.
    pub async fn conversation_id(&self) -> Option<String> {
        self.state.lock().await.conversation_id.clone()
    }

    /// Messages that exhausted their retry budget, newest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.state.lock().await.dead_letters.clone()
    }

    /// Number of dead-lettered messages.
    pub async fn dead_letter_count(&self) -> usize {
        self.state.lock().await.dead_letters.len()
    }

    /// Permanently delete a dead-lettered message.
    ///
    /// Returns false if no entry with that id exists.
    pub async fn delete_dead_letter(&self, id: &str) -> bool {
        let mut guard = self.state.lock().await;
        let before = guard.dead_letters.len();
        guard.dead_letters.retain(|entry| entry.id != id);
        let removed = guard.dead_letters.len() != before;
        if removed {
            info!(message_id = %id, "dead letter deleted");
            persist(&guard, self.store.as_ref());
        }
        removed
    }

    /// Re-enter a dead-lettered message into the live buffer with a fresh
    /// retry budget.
    ///
    /// Returns false if no entry with that id exists.
    pub async fn retry_dead_letter(&self, id: &str) -> bool {
        let needs_conversation = {
            let mut guard = self.state.lock().await;
            let Some(position) = guard.dead_letters.iter().position(|entry| entry.id == id)
            else {
                return false;
            };
            let entry = guard.dead_letters.remove(position);
            guard.pending.push_back(entry.into_retry());
            persist(&guard, self.store.as_ref());
            guard.conversation_id.is_none()
        };

        info!(message_id = %id, "dead letter re-queued");
        if needs_conversation {
            self.signal_flush_now();
        }
        true
    }

    fn signal_flush_now(&self) {
        if let Err(err) = self.signal_tx.try_send(OutboxSignal::FlushNow) {
            debug!(error = %err, "forced flush signal dropped");
        }
    }
}

fn apply_outcome(retry_at: &mut Option<Instant>, outcome: FlushOutcome) {
    match outcome {
        FlushOutcome::Retry(delay) => {
            debug!(delay_ms = delay.as_millis() as u64, "retry scheduled");
            *retry_at = Some(Instant::now() + delay);
        }
        FlushOutcome::Clean => *retry_at = None,
        FlushOutcome::Skipped => {}
    }
}

fn retry_deadline(retry_at: Option<Instant>) -> Instant {
    // The branch is disabled when no retry is pending; the fallback is never
    // actually slept on.
    retry_at.unwrap_or_else(|| Instant::now() + Duration::from_secs(86400))
}

impl std::fmt::Debug for ChatOutbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOutbox").finish_non_exhaustive()
    }
}
