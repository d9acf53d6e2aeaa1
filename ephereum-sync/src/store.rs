//! Per-identity mailbox state.
//!
//! The engine keeps the active identity's state in memory and writes it
//! through a [`SyncStateStore`] after every completed cycle, so switching
//! identities and back restores the mailbox without rescanning.

use serde::{Deserialize, Serialize};

use ephereum_cache::{CacheConfig, TtlCache};
use ephereum_core::types::{ChatMessage, PendingAnnouncement, SyncWatermark};

/// Coarse engine state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Not syncing
    #[default]
    Idle,
    /// A cycle is in flight
    Syncing,
    /// The last cycle failed at the scan level
    Error,
}

/// Observable engine status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Current state
    pub state: SyncState,
    /// Unix milliseconds of the last completed cycle
    pub last_synced_at: Option<i64>,
    /// Watermark after the last completed cycle
    pub last_synced_block: Option<u64>,
    /// User-facing message when `state` is `Error`
    pub error: Option<String>,
}

/// Everything the engine knows about one identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxState {
    /// Materialized messages, ascending processing order
    pub messages: Vec<ChatMessage>,
    /// Placeholders awaiting a retry
    pub pending: Vec<PendingAnnouncement>,
    /// How far this identity has scanned
    pub watermark: SyncWatermark,
    /// Last published status
    pub status: SyncStatus,
}

/// Storage for [`MailboxState`] keyed by identity.
pub trait SyncStateStore: Send + Sync {
    /// Returns the stored state, if any.
    fn load(&self, identity: &str) -> Option<MailboxState>;

    /// Replaces the stored state.
    fn save(&self, identity: &str, state: MailboxState);

    /// Forgets an identity.
    fn remove(&self, identity: &str);
}

/// In-process store. Entries never expire; capacity bounds the number of
/// identities kept.
#[derive(Debug)]
pub struct MemorySyncStore {
    cache: TtlCache<MailboxState>,
}

impl MemorySyncStore {
    /// Default number of identities kept.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty store keeping at most `capacity` identities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: TtlCache::with_config(CacheConfig::default().max_entries(capacity)),
        }
    }

    /// Number of identities stored.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if no identity is stored.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for MemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateStore for MemorySyncStore {
    fn load(&self, identity: &str) -> Option<MailboxState> {
        self.cache.get(identity)
    }

    fn save(&self, identity: &str, state: MailboxState) {
        self.cache.set_permanent(identity, state);
    }

    fn remove(&self, identity: &str) {
        self.cache.remove(identity);
    }
}
