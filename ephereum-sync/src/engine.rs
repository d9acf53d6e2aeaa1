//! The mailbox sync engine.
//!
//! One cycle:
//!
//! 1. Scan envelope logs from the watermark for the active identity
//! 2. Drop matches already materialized, pending, or repeated in the batch
//! 3. Look up senders and block timestamps for the rest
//! 4. Fetch and decrypt every new match and every previously pending entry
//! 5. Upsert messages, rebuild the pending queue, advance the watermark
//!
//! Only step 5 touches shared state, and only if the identity generation is
//! unchanged since step 1. A reset or identity switch mid-cycle therefore
//! discards the result instead of cancelling the network calls.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use ephereum_core::constants::{
    ENCRYPTED_THREAD_ID, LOADING_CONTENT, LOADING_THREAD_ID, UNDECRYPTABLE_CONTENT, UNTITLED_THREAD_ID,
};
use ephereum_core::error::Result;
use ephereum_core::traits::{BlobStore, LogSource};
use ephereum_core::types::{now_millis, ChatMessage, CompressedPoint, Direction, PendingAnnouncement, SyncWatermark};
use ephereum_payload::{decode_blob_payload, decrypt_message};
use ephereum_scanner::{AnnouncementScanner, ScanMatch, ScannerConfig};
use ephereum_stealth::RecipientKeys;

use crate::hints::{user_error_message, DECRYPT_FAILED, SYNC_FAILED};
use crate::lookup::{lookup_senders, lookup_timestamps};
use crate::store::{MailboxState, MemorySyncStore, SyncState, SyncStateStore, SyncStatus};

/// Default period of [`ChatSyncEngine::spawn_periodic`].
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Where and how to scan
    pub scanner: ScannerConfig,
    /// First block of an identity's first scan
    pub start_block: u64,
    /// Period of background syncs
    pub interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            start_block: 0,
            interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

impl SyncConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scanner configuration.
    pub fn scanner(mut self, scanner: ScannerConfig) -> Self {
        self.scanner = scanner;
        self
    }

    /// Sets the first block scanned for a new identity.
    pub fn start_block(mut self, block: u64) -> Self {
        self.start_block = block;
        self
    }

    /// Sets the background sync period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Counters for one completed cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// First block scanned
    pub from_block: u64,
    /// Logs returned by the scan
    pub logs_scanned: usize,
    /// New matches decrypted this cycle
    pub new_messages: usize,
    /// New matches left pending this cycle
    pub new_pending: usize,
    /// Previously pending entries decrypted this cycle
    pub resolved: usize,
    /// Pending queue length after the cycle
    pub still_pending: usize,
    /// Watermark after the cycle
    pub last_synced_block: Option<u64>,
}

/// What a call to [`ChatSyncEngine::sync_now`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No identity, or another cycle was in flight
    Skipped,
    /// The cycle ran and its result was applied
    Completed(SyncReport),
    /// The scan failed; carries the user-facing message
    Failed(String),
    /// The identity changed mid-cycle; the result was dropped
    Discarded,
}

struct Identity {
    key: String,
    keys: RecipientKeys,
}

enum Resolution {
    Decrypted(ChatMessage),
    Unavailable,
    Undecryptable(String),
}

/// Changes computed by a cycle, applied in one step.
struct Cycle {
    upserts: Vec<ChatMessage>,
    pending: Vec<PendingAnnouncement>,
    observed_blocks: Vec<u64>,
    report: SyncReport,
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Keeps one identity's mailbox in sync with the chain.
///
/// # Concurrency
///
/// `sync_now` is non-reentrant: a call while another is in flight returns
/// [`SyncOutcome::Skipped`] at once. Locks are never held across `.await`.
pub struct ChatSyncEngine {
    scanner: AnnouncementScanner,
    log_source: Arc<dyn LogSource>,
    blob_store: Arc<dyn BlobStore>,
    store: Arc<dyn SyncStateStore>,
    config: SyncConfig,
    identity: RwLock<Option<Arc<Identity>>>,
    state: RwLock<MailboxState>,
    status: watch::Sender<SyncStatus>,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl ChatSyncEngine {
    /// Creates an engine with default configuration and an in-memory store.
    pub fn new(log_source: Arc<dyn LogSource>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self::with_config(log_source, blob_store, Arc::new(MemorySyncStore::new()), SyncConfig::default())
    }

    /// Creates an engine with an explicit store and configuration.
    pub fn with_config(
        log_source: Arc<dyn LogSource>,
        blob_store: Arc<dyn BlobStore>,
        store: Arc<dyn SyncStateStore>,
        config: SyncConfig,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());

        Self {
            scanner: AnnouncementScanner::with_config(log_source.clone(), config.scanner.clone()),
            log_source,
            blob_store,
            store,
            config,
            identity: RwLock::new(None),
            state: RwLock::new(MailboxState::default()),
            status,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Switches the active identity, loading its stored state.
    ///
    /// `None` locks the engine: later syncs are skipped. A cycle in flight
    /// for the previous identity is discarded when it resolves.
    pub fn set_identity(&self, keys: Option<RecipientKeys>) {
        let identity = keys.map(|keys| {
            Arc::new(Identity {
                key: keys.identity_key(),
                keys,
            })
        });

        let mut state = self.state.write();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut loaded = identity
            .as_ref()
            .and_then(|id| self.store.load(&id.key))
            .unwrap_or_default();
        if loaded.status.state == SyncState::Syncing {
            loaded.status.state = SyncState::Idle;
        }

        debug!(
            identity = identity.as_ref().map(|id| id.key.as_str()),
            messages = loaded.messages.len(),
            pending = loaded.pending.len(),
            "Identity switched"
        );

        self.status.send_replace(loaded.status.clone());
        *state = loaded;
        *self.identity.write() = identity;
    }

    /// `viewPub:spendPub` of the active identity.
    pub fn identity_key(&self) -> Option<String> {
        self.identity.read().as_ref().map(|id| id.key.clone())
    }

    /// Clears the active identity's messages, pending queue, watermark and
    /// stored state. The identity itself stays active.
    pub fn reset_state(&self) {
        let mut state = self.state.write();
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(identity) = self.identity.read().as_ref() {
            self.store.remove(&identity.key);
        }

        *state = MailboxState::default();
        self.status.send_replace(SyncStatus::default());
        info!("Mailbox state reset");
    }

    /// Observes status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// True while a cycle is in flight.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Messages in ascending processing order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().messages.clone()
    }

    /// Messages newest first.
    pub fn messages_for_display(&self) -> Vec<ChatMessage> {
        let mut messages = self.messages();
        messages.sort_by(ChatMessage::display_order);
        messages
    }

    /// Entries awaiting a retry.
    pub fn pending(&self) -> Vec<PendingAnnouncement> {
        self.state.read().pending.clone()
    }

    /// How far the active identity has scanned.
    pub fn watermark(&self) -> SyncWatermark {
        self.state.read().watermark
    }

    /// Runs one sync cycle for the active identity.
    #[instrument(skip(self))]
    pub async fn sync_now(&self) -> SyncOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Sync already in flight");
            return SyncOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_flight);

        // Identity and generation are read under the lock `set_identity` holds.
        let (identity, generation, from_block, known, retry) = {
            let mut state = self.state.write();
            let Some(identity) = self.identity.read().clone() else {
                debug!("No active identity");
                return SyncOutcome::Skipped;
            };
            let generation = self.generation.load(Ordering::SeqCst);
            let from_block = state.watermark.next_from_block().max(self.config.start_block);
            let known: HashSet<String> = state
                .messages
                .iter()
                .map(|m| m.id.clone())
                .chain(state.pending.iter().map(|p| p.id.clone()))
                .collect();
            let retry = state.pending.clone();

            state.status.state = SyncState::Syncing;
            state.status.error = None;
            self.status.send_replace(state.status.clone());

            (identity, generation, from_block, known, retry)
        };

        let result = self.run_cycle(&identity.keys, from_block, known, retry).await;

        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Identity changed during sync, discarding result");
            return SyncOutcome::Discarded;
        }

        match result {
            Ok(cycle) => {
                let report = Self::apply(&mut state, cycle);
                self.status.send_replace(state.status.clone());
                self.store.save(&identity.key, state.clone());

                info!(
                    from_block = report.from_block,
                    logs = report.logs_scanned,
                    new_messages = report.new_messages,
                    new_pending = report.new_pending,
                    resolved = report.resolved,
                    still_pending = report.still_pending,
                    last_synced_block = ?report.last_synced_block,
                    "Sync complete"
                );
                SyncOutcome::Completed(report)
            }
            Err(e) => {
                let message = user_error_message(&e.to_string(), SYNC_FAILED);
                warn!(error = %e, "Sync failed");

                state.status.state = SyncState::Error;
                state.status.error = Some(message.clone());
                self.status.send_replace(state.status.clone());
                self.store.save(&identity.key, state.clone());

                SyncOutcome::Failed(message)
            }
        }
    }

    /// Calls [`ChatSyncEngine::sync_now`] every `config.interval`, starting
    /// immediately.
    pub fn spawn_periodic(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let SyncOutcome::Failed(message) = self.sync_now().await {
                    debug!(%message, "Periodic sync failed");
                }
            }
        })
    }

    async fn run_cycle(
        &self,
        keys: &RecipientKeys,
        from_block: u64,
        mut known: HashSet<String>,
        retry: Vec<PendingAnnouncement>,
    ) -> Result<Cycle> {
        let outcome = self.scanner.scan(keys, from_block).await?;

        let fresh: Vec<&ScanMatch> = outcome
            .matches
            .iter()
            .filter(|m| known.insert(m.message_id()))
            .collect();

        let missing_senders = retry.iter().filter(|p| p.sender.is_none()).map(|p| p.transaction_hash);
        let senders = lookup_senders(
            self.log_source.as_ref(),
            fresh.iter().map(|m| m.transaction_hash).chain(missing_senders),
        )
        .await;
        let timestamps = lookup_timestamps(self.log_source.as_ref(), fresh.iter().map(|m| m.block_number)).await;
        let now = now_millis();

        let new_entries: Vec<PendingAnnouncement> = fresh
            .iter()
            .map(|m| PendingAnnouncement {
                id: m.message_id(),
                transaction_hash: m.transaction_hash,
                ephem_pub_key: m.ephem_pub_key.as_bytes().to_vec(),
                view_tag: m.view_tag,
                payload_hash: m.payload_hash(),
                block_number: m.block_number,
                log_index: m.log_index,
                recipient: m.stealth_address,
                sender: senders.get(&m.transaction_hash).copied(),
                created_at: timestamps.get(&m.block_number).copied().unwrap_or(now),
                error: None,
            })
            .collect();

        let retry: Vec<PendingAnnouncement> = retry
            .into_iter()
            .map(|mut entry| {
                if entry.sender.is_none() {
                    entry.sender = senders.get(&entry.transaction_hash).copied();
                }
                entry
            })
            .collect();

        let (new_results, retry_results) = futures::join!(
            join_all(new_entries.iter().map(|entry| self.resolve(entry, keys))),
            join_all(retry.iter().map(|entry| self.resolve(entry, keys))),
        );

        let mut cycle = Cycle {
            upserts: Vec::new(),
            pending: Vec::new(),
            observed_blocks: outcome.logs.iter().map(|log| log.block_number).collect(),
            report: SyncReport {
                from_block,
                logs_scanned: outcome.logs.len(),
                ..Default::default()
            },
        };

        for (entry, resolution) in retry.into_iter().zip(retry_results) {
            match resolution {
                Resolution::Decrypted(message) => {
                    cycle.upserts.push(message);
                    cycle.report.resolved += 1;
                }
                Resolution::Unavailable => cycle.pending.push(entry),
                Resolution::Undecryptable(reason) => {
                    cycle.upserts.push(placeholder(&entry, ENCRYPTED_THREAD_ID, UNDECRYPTABLE_CONTENT));
                    cycle.pending.push(PendingAnnouncement {
                        error: Some(reason),
                        ..entry
                    });
                }
            }
        }

        for (entry, resolution) in new_entries.into_iter().zip(new_results) {
            match resolution {
                Resolution::Decrypted(message) => {
                    cycle.upserts.push(message);
                    cycle.report.new_messages += 1;
                }
                Resolution::Unavailable => {
                    cycle.upserts.push(placeholder(&entry, LOADING_THREAD_ID, LOADING_CONTENT));
                    cycle.pending.push(entry);
                    cycle.report.new_pending += 1;
                }
                Resolution::Undecryptable(reason) => {
                    cycle.upserts.push(placeholder(&entry, ENCRYPTED_THREAD_ID, UNDECRYPTABLE_CONTENT));
                    cycle.pending.push(PendingAnnouncement {
                        error: Some(reason),
                        ..entry
                    });
                    cycle.report.new_pending += 1;
                }
            }
        }

        Ok(cycle)
    }

    async fn resolve(&self, entry: &PendingAnnouncement, keys: &RecipientKeys) -> Resolution {
        let Some(bytes) = self.blob_store.fetch_blob(&entry.transaction_hash).await else {
            debug!(id = %entry.id, tx = %entry.transaction_hash, "Blob not available");
            return Resolution::Unavailable;
        };

        let frame = decode_blob_payload(&bytes);
        let decrypted = CompressedPoint::from_bytes(&entry.ephem_pub_key)
            .and_then(|ephem_pub| decrypt_message(&frame, &keys.view().private_key, &ephem_pub));

        match decrypted {
            Ok(payload) => {
                let thread_id = match payload.thread_id.trim() {
                    "" => UNTITLED_THREAD_ID.to_string(),
                    _ => payload.thread_id,
                };
                Resolution::Decrypted(ChatMessage {
                    thread_id,
                    content: payload.content,
                    content_available: true,
                    ..placeholder(entry, "", "")
                })
            }
            Err(e) => {
                warn!(id = %entry.id, error = %e, "Payload did not decrypt");
                Resolution::Undecryptable(user_error_message(&e.to_string(), DECRYPT_FAILED))
            }
        }
    }

    fn apply(state: &mut MailboxState, cycle: Cycle) -> SyncReport {
        for message in cycle.upserts {
            match state.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => existing.merge(message),
                None => state.messages.push(message),
            }
        }
        state.messages.sort_by(ChatMessage::processing_order);

        state.pending = cycle.pending;
        state.watermark.advance(cycle.observed_blocks);

        state.status = SyncStatus {
            state: SyncState::Idle,
            last_synced_at: Some(now_millis()),
            last_synced_block: state.watermark.last_synced_block,
            error: None,
        };

        SyncReport {
            still_pending: state.pending.len(),
            last_synced_block: state.watermark.last_synced_block,
            ..cycle.report
        }
    }
}

/// Inbound message for `entry` with no decrypted content.
fn placeholder(entry: &PendingAnnouncement, thread_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: entry.id.clone(),
        thread_id: thread_id.to_string(),
        content: content.to_string(),
        created_at: entry.created_at,
        direction: Direction::Inbound,
        transaction_hash: entry.transaction_hash,
        sender: entry.sender,
        recipient: Some(entry.recipient),
        content_available: false,
        payload_hash: entry.payload_hash,
        block_number: Some(entry.block_number),
        log_index: Some(entry.log_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ephereum_core::traits::BlockTag;
    use ephereum_core::types::{Announcement, EthAddress, TxHash, H256};
    use ephereum_payload::{prepare_message, OutgoingEnvelope};
    use ephereum_registry::{MemoryBlobStore, MemoryRegistry};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tokio::sync::Notify;

    const SENDER: [u8; 20] = [0x5E; 20];

    struct Harness {
        registry: Arc<MemoryRegistry>,
        blobs: Arc<MemoryBlobStore>,
        keys: RecipientKeys,
        engine: ChatSyncEngine,
    }

    fn keys(seed: u64) -> RecipientKeys {
        RecipientKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(seed))
    }

    fn harness() -> Harness {
        let registry = Arc::new(MemoryRegistry::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let engine = ChatSyncEngine::new(registry.clone(), blobs.clone());
        let keys = keys(1);
        engine.set_identity(Some(keys.clone()));
        Harness {
            registry,
            blobs,
            keys,
            engine,
        }
    }

    fn tx_hash(block: u64, index: u64) -> TxHash {
        let mut tx = [0u8; 32];
        tx[..8].copy_from_slice(&block.to_be_bytes());
        tx[8..16].copy_from_slice(&index.to_be_bytes());
        TxHash::from_array(tx)
    }

    fn announce(registry: &MemoryRegistry, envelope: &OutgoingEnvelope, block: u64, index: u64) -> TxHash {
        let mut ann = envelope.announcement();
        ann.block_number = block;
        ann.log_index = index;
        ann.transaction_hash = tx_hash(block, index);
        registry.publish(ann, EthAddress::from_array(SENDER), block as i64 * 12_000);
        tx_hash(block, index)
    }

    /// Prepares, announces and (optionally) uploads a message.
    fn send(h: &Harness, content: &str, block: u64, index: u64, upload: bool) -> (OutgoingEnvelope, TxHash) {
        let envelope = prepare_message(&h.keys.meta_address(), content, "plans").unwrap();
        let tx = announce(&h.registry, &envelope, block, index);
        if upload {
            h.blobs.put(tx, envelope.blobs.concat());
        }
        (envelope, tx)
    }

    fn completed(outcome: SyncOutcome) -> SyncReport {
        match outcome {
            SyncOutcome::Completed(report) => report,
            other => panic!("expected a completed sync, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sync_without_identity_is_skipped() {
        let registry = Arc::new(MemoryRegistry::new());
        let engine = ChatSyncEngine::new(registry.clone(), Arc::new(MemoryBlobStore::new()));

        assert_eq!(engine.sync_now().await, SyncOutcome::Skipped);
        assert!(registry.queries().is_empty());
    }

    #[tokio::test]
    async fn test_sync_decrypts_inbound_message() {
        let h = harness();
        let (envelope, tx) = send(&h, "hello bob", 7, 0, true);

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.new_messages, 1);
        assert_eq!(report.new_pending, 0);
        assert_eq!(report.last_synced_block, Some(7));

        let messages = h.engine.messages();
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.id, envelope.payload_hash.to_hex());
        assert_eq!(message.content, "hello bob");
        assert_eq!(message.thread_id, "plans");
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.transaction_hash, tx);
        assert_eq!(message.sender, Some(EthAddress::from_array(SENDER)));
        assert_eq!(message.recipient, Some(envelope.stealth_address));
        assert_eq!(message.created_at, 7 * 12_000);
        assert!(message.content_available);
        assert!(h.engine.pending().is_empty());

        let status = h.engine.status();
        assert_eq!(status.state, SyncState::Idle);
        assert_eq!(status.last_synced_block, Some(7));
        assert!(status.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_foreign_announcements_are_ignored() {
        let h = harness();
        let other = keys(2);
        let envelope = prepare_message(&other.meta_address(), "not yours", "t").unwrap();
        announce(&h.registry, &envelope, 3, 0);

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.logs_scanned, 1);
        assert!(h.engine.messages().is_empty());
        assert_eq!(h.blobs.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_payload_hash_materializes_once() {
        let h = harness();
        let (envelope, first) = send(&h, "once", 10, 0, true);
        let second = announce(&h.registry, &envelope, 11, 0);
        h.blobs.put(second, envelope.blobs.concat());

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.new_messages, 1);

        let messages = h.engine.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].transaction_hash, first);
        assert_eq!(h.blobs.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_blob_is_retried_until_available() {
        let h = harness();
        let (envelope, tx) = send(&h, "eventually", 20, 0, false);

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.new_pending, 1);

        let pending = h.engine.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, envelope.payload_hash.to_hex());
        assert!(pending[0].error.is_none());

        let placeholder = &h.engine.messages()[0];
        assert!(!placeholder.content_available);
        assert_eq!(placeholder.thread_id, "Loading...");
        assert_eq!(placeholder.content, "Loading encrypted payload...");

        // Still missing: stays pending, nothing rescanned.
        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.still_pending, 1);

        h.blobs.put(tx, envelope.blobs.concat());
        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.still_pending, 0);
        assert!(h.engine.pending().is_empty());

        let messages = h.engine.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content_available);
        assert_eq!(messages[0].content, "eventually");
        assert_eq!(messages[0].thread_id, "plans");
        assert_eq!(messages[0].sender, Some(EthAddress::from_array(SENDER)));
    }

    #[tokio::test]
    async fn test_undecryptable_payload_stays_pending_with_reason() {
        let h = harness();
        let (_, tx) = send(&h, "garbled", 4, 0, false);
        h.blobs.put(tx, vec![0u8; 64]);

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.new_pending, 1);

        let message = &h.engine.messages()[0];
        assert_eq!(message.thread_id, "Encrypted");
        assert_eq!(message.content, "Encrypted content (pending decryption).");
        assert!(!message.content_available);

        let pending = h.engine.pending();
        assert_eq!(pending[0].error.as_deref(), Some("Failed to decrypt."));
    }

    #[tokio::test]
    async fn test_watermark_makes_second_sync_incremental() {
        let h = harness();
        send(&h, "early", 50, 0, true);
        let foreign = prepare_message(&keys(3).meta_address(), "x", "t").unwrap();
        announce(&h.registry, &foreign, 100, 0);

        completed(h.engine.sync_now().await);
        assert_eq!(h.engine.watermark().last_synced_block, Some(100));

        completed(h.engine.sync_now().await);
        let queries = h.registry.queries();
        assert_eq!(queries[0].from_block, 0);
        assert_eq!(queries[1].from_block, 101);
    }

    #[tokio::test]
    async fn test_every_match_below_watermark_is_materialized() {
        let h = harness();
        for block in 1..=3 {
            send(&h, &format!("message {}", block), block, 0, true);
        }

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.logs_scanned, 3);
        assert_eq!(report.new_messages, 3);
        assert_eq!(report.last_synced_block, Some(3));

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.from_block, 4);
        assert_eq!(report.logs_scanned, 0);

        let contents: Vec<String> = h.engine.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["message 1", "message 2", "message 3"]);
    }

    #[tokio::test]
    async fn test_empty_scan_keeps_watermark() {
        let h = harness();
        send(&h, "a", 5, 0, true);
        completed(h.engine.sync_now().await);

        let report = completed(h.engine.sync_now().await);
        assert_eq!(report.logs_scanned, 0);
        assert_eq!(report.last_synced_block, Some(5));
    }

    #[tokio::test]
    async fn test_log_failure_sets_error_and_keeps_messages() {
        let h = harness();
        send(&h, "kept", 1, 0, true);
        completed(h.engine.sync_now().await);

        h.registry.set_unavailable(true);
        assert_eq!(h.engine.sync_now().await, SyncOutcome::Failed("Sync failed.".into()));

        let status = h.engine.status();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.error.as_deref(), Some("Sync failed."));
        assert_eq!(status.last_synced_block, Some(1));
        assert_eq!(h.engine.messages().len(), 1);

        h.registry.set_unavailable(false);
        completed(h.engine.sync_now().await);
        assert_eq!(h.engine.status().state, SyncState::Idle);
        assert!(h.engine.status().error.is_none());
    }

    #[tokio::test]
    async fn test_message_orders() {
        let h = harness();
        send(&h, "later", 9, 0, true);
        send(&h, "earlier", 5, 2, true);
        send(&h, "same block", 9, 1, true);
        completed(h.engine.sync_now().await);

        let ascending: Vec<String> = h.engine.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(ascending, ["earlier", "later", "same block"]);

        let display: Vec<String> = h.engine.messages_for_display().into_iter().map(|m| m.content).collect();
        assert_eq!(display, ["same block", "later", "earlier"]);
    }

    #[tokio::test]
    async fn test_identity_switch_restores_state() {
        let h = harness();
        send(&h, "for one", 2, 0, true);
        completed(h.engine.sync_now().await);

        h.engine.set_identity(Some(keys(9)));
        assert!(h.engine.messages().is_empty());
        assert_eq!(h.engine.watermark(), SyncWatermark::default());

        h.engine.set_identity(Some(h.keys.clone()));
        assert_eq!(h.engine.messages().len(), 1);
        assert_eq!(h.engine.watermark().last_synced_block, Some(2));
        assert_eq!(h.engine.identity_key(), Some(h.keys.identity_key()));

        h.engine.set_identity(None);
        assert_eq!(h.engine.sync_now().await, SyncOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_reset_state_clears_everything() {
        let h = harness();
        send(&h, "gone", 2, 0, false);
        completed(h.engine.sync_now().await);

        h.engine.reset_state();
        assert!(h.engine.messages().is_empty());
        assert!(h.engine.pending().is_empty());
        assert_eq!(h.engine.status(), SyncStatus::default());

        completed(h.engine.sync_now().await);
        assert_eq!(h.registry.queries().last().unwrap().from_block, 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_status() {
        let h = harness();
        let rx = h.engine.subscribe();
        send(&h, "hi", 3, 0, true);

        completed(h.engine.sync_now().await);
        assert_eq!(rx.borrow().state, SyncState::Idle);
        assert_eq!(rx.borrow().last_synced_block, Some(3));
    }

    /// Log source whose `get_logs` waits for a signal.
    struct GatedSource {
        inner: Arc<MemoryRegistry>,
        gate: Notify,
    }

    #[async_trait]
    impl LogSource for GatedSource {
        async fn get_logs(
            &self,
            address: &EthAddress,
            event_signature: &H256,
            from_block: u64,
            to_block: BlockTag,
        ) -> Result<Vec<Announcement>> {
            self.gate.notified().await;
            self.inner.get_logs(address, event_signature, from_block, to_block).await
        }

        async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress> {
            self.inner.get_transaction_sender(tx_hash).await
        }

        async fn get_block_timestamp(&self, block_number: u64) -> Result<i64> {
            self.inner.get_block_timestamp(block_number).await
        }
    }

    fn gated() -> (Harness, Arc<GatedSource>, Arc<ChatSyncEngine>) {
        let h = harness();
        let source = Arc::new(GatedSource {
            inner: h.registry.clone(),
            gate: Notify::new(),
        });
        let engine = Arc::new(ChatSyncEngine::new(source.clone(), h.blobs.clone()));
        engine.set_identity(Some(h.keys.clone()));
        (h, source, engine)
    }

    async fn wait_until_syncing(engine: &ChatSyncEngine) {
        while !engine.is_syncing() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_skipped() {
        let (h, source, engine) = gated();
        send(&h, "one", 1, 0, true);

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync_now().await }
        });
        wait_until_syncing(&engine).await;

        assert_eq!(engine.sync_now().await, SyncOutcome::Skipped);
        assert_eq!(engine.status().state, SyncState::Syncing);

        source.gate.notify_one();
        let report = completed(first.await.unwrap());
        assert_eq!(report.new_messages, 1);
        assert!(!engine.is_syncing());
        assert_eq!(h.registry.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_during_sync_discards_result() {
        let (h, source, engine) = gated();
        send(&h, "discarded", 1, 0, true);

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync_now().await }
        });
        wait_until_syncing(&engine).await;

        engine.reset_state();
        source.gate.notify_one();

        assert_eq!(first.await.unwrap(), SyncOutcome::Discarded);
        assert!(engine.messages().is_empty());
        assert_eq!(engine.watermark(), SyncWatermark::default());
        assert_eq!(engine.status(), SyncStatus::default());
    }

    #[tokio::test]
    async fn test_identity_switch_during_sync_discards_result() {
        let (h, source, engine) = gated();
        send(&h, "for the old identity", 1, 0, true);

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.sync_now().await }
        });
        wait_until_syncing(&engine).await;

        let next = keys(9);
        engine.set_identity(Some(next.clone()));
        source.gate.notify_one();

        assert_eq!(first.await.unwrap(), SyncOutcome::Discarded);
        assert_eq!(engine.identity_key(), Some(next.identity_key()));
        assert!(engine.messages().is_empty());
        assert_eq!(engine.watermark(), SyncWatermark::default());

        source.gate.notify_one();
        let report = completed(engine.sync_now().await);
        assert_eq!(report.logs_scanned, 1);
        assert_eq!(report.new_messages, 0);
        assert!(engine.messages().is_empty());
    }
}
