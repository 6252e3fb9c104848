//! Remote writer for the conversation store.
//!
//! This crate owns the seam between the chat outbox and the managed backend:
//!
//! - [`ConversationWriter`]: the trait consumed by the delivery queue. One
//!   single-row insert that mints a conversation id, and one batch insert
//!   tagged with a known conversation id. Both calls are all-or-nothing.
//! - [`ConversationApiClient`]: reqwest implementation against the backend's
//!   REST endpoint.
//! - [`RecordingWriter`]: in-memory implementation with injectable failures,
//!   exported for downstream tests.

mod client;
mod error;
mod recording;
mod writer;

pub use client::ConversationApiClient;
pub use error::{ConversationSyncError, SyncResult};
pub use recording::RecordingWriter;
pub use writer::{ConversationWriter, MessageRow};
