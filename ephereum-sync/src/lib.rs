//! # Ephereum Sync
//!
//! Keeps a recipient's mailbox in step with the chain.
//!
//! - **engine**: [`ChatSyncEngine`], the non-reentrant sync loop
//! - **store**: per-identity state and its storage
//! - **lookup**: batched sender and timestamp lookups
//! - **outbound**: the local accounts' sent history
//! - **hints**: short user-facing error wording
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ephereum_sync::{ChatSyncEngine, SyncOutcome};
//!
//! let engine = ChatSyncEngine::new(log_source, blob_store);
//! engine.set_identity(Some(keys));
//!
//! if let SyncOutcome::Completed(report) = engine.sync_now().await {
//!     println!("{} new messages", report.new_messages);
//! }
//! for message in engine.messages_for_display() {
//!     println!("[{}] {}", message.thread_id, message.content);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod engine;
pub mod hints;
mod lookup;
pub mod outbound;
mod store;

pub use engine::{ChatSyncEngine, SyncConfig, SyncOutcome, SyncReport, DEFAULT_SYNC_INTERVAL};
pub use hints::user_error_message;
pub use lookup::{lookup_senders, lookup_timestamps};
pub use outbound::{sent_messages, SentHistory};
pub use store::{MailboxState, MemorySyncStore, SyncState, SyncStateStore, SyncStatus};
