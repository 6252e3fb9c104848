//! # Chat message outbox
//!
//! A client-side store-and-forward queue that guarantees outgoing chat
//! messages eventually reach the remote conversation store despite transient
//! connectivity loss, without blocking the interactive surface.
//!
//! ```text
//! ┌────────────┐     ┌─────────────────┐     ┌────────────────────┐
//! │  Chat UI   │────▶│   ChatOutbox    │────▶│ Conversation store │
//! │ (enqueue)  │     │ (flush engine)  │     │     (remote)       │
//! └────────────┘     └────────┬────────┘     └────────────────────┘
//!                             │
//!                     ┌───────▼────────┐
//!                     │ Snapshot store │
//!                     │  (durable KV)  │
//!                     └────────────────┘
//! ```
//!
//! ## Key behaviors
//!
//! - **Session assignment, exactly once**: the first successful remote write
//!   mints a conversation id; every later write is tagged with it.
//! - **Single-flight flushes**: at most one flush executes at a time; a flush
//!   requested while one is in progress is a no-op.
//! - **Exponential backoff**: failed writes are re-buffered and retried after
//!   `base * 2^(attempts-1)` capped at 60s.
//! - **Dead letters**: a message that exhausts its retry budget moves to a
//!   dead-letter list surfaced for manual retry or deletion, never silently
//!   dropped.
//! - **Crash safety**: the full queue state is persisted after every mutation
//!   and restored by [`ChatOutbox::load`] on startup.
//!
//! ## Example
//!
//! ```ignore
//! use chat_message_outbox::{ChatOutbox, MessageRole, OutboxConfig};
//!
//! let outbox = ChatOutbox::new(OutboxConfig::default(), writer, store);
//! outbox.load().await;
//! outbox.start();
//!
//! outbox.enqueue(MessageRole::User, "What is a derivative?").await;
//! // ... later, on app teardown:
//! let done = outbox.shutdown();
//! let _ = done.await; // optional: await the final best-effort flush
//! ```

mod config;
mod engine;
mod error;
mod message;
mod outbox;
mod snapshot;

pub use config::{backoff_delay, OutboxConfig};
pub use error::{OutboxError, OutboxResult};
pub use message::{DeadLetterEntry, MessageRole, PendingMessage};
pub use outbox::ChatOutbox;
pub use snapshot::{QueueSnapshot, SnapshotKeys};
