//! # Ephereum Scanner
//!
//! Finds the announcements addressed to a recipient.
//!
//! ## Features
//!
//! - **Block-range scans**: query the envelope registry from a block to the head
//! - **Two-stage matching**: view-tag filter, then address equality
//! - **Tolerant metadata**: foreign or garbage metadata never fails a scan
//! - **Progress reporting**: callbacks for UI progress updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ephereum_scanner::{AnnouncementScanner, ScannerConfig};
//!
//! let scanner = AnnouncementScanner::new(Arc::new(log_source));
//! let outcome = scanner.scan(&keys, 0).await?;
//!
//! for found in &outcome.matches {
//!     println!("Message for {} in tx {}", found.stealth_address, found.transaction_hash);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use ephereum_core::constants::MESSAGE_ENVELOPE_REGISTRY;
use ephereum_core::error::Result;
use ephereum_core::traits::{BlockTag, LogSource};
use ephereum_core::types::{message_id, Announcement, CompressedPoint, EthAddress, PayloadHash, PrivateKey, TxHash, H256};
use ephereum_payload::AnnouncementMetadata;
use ephereum_registry::message_envelope_topic;
use ephereum_stealth::{check_announcement, RecipientKeys, ScanResult, ScanStats};

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Contract emitting `MessageEnvelope` events
    pub registry_address: EthAddress,
    /// topic0 to filter on
    pub event_signature: H256,
    /// Upper bound of every scan
    pub to_block: BlockTag,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            registry_address: EthAddress::from_hex(MESSAGE_ENVELOPE_REGISTRY).unwrap_or_else(|_| EthAddress::zero()),
            event_signature: message_envelope_topic(),
            to_block: BlockTag::Latest,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registry address.
    pub fn registry_address(mut self, address: EthAddress) -> Self {
        self.registry_address = address;
        self
    }

    /// Sets the upper block bound.
    pub fn to_block(mut self, to_block: BlockTag) -> Self {
        self.to_block = to_block;
        self
    }
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Logs to check
    pub total: u64,
    /// Logs checked so far
    pub scanned: u64,
    /// Matches found so far
    pub matches: u64,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: 0,
            matches: 0,
            percent: if total == 0 { 100.0 } else { 0.0 },
        }
    }

    /// Updates progress with new values.
    pub fn update(&mut self, scanned: u64, matches: u64) {
        self.scanned = scanned;
        self.matches = matches;
        if self.total > 0 {
            self.percent = (scanned as f64 / self.total as f64) * 100.0;
        }
    }
}

/// A verified announcement for the scanning recipient.
#[derive(Clone, Debug)]
pub struct ScanMatch {
    /// Announced (and re-derived) stealth address
    pub stealth_address: EthAddress,
    /// Key controlling `stealth_address`
    pub stealth_priv_key: PrivateKey,
    /// Sender's ephemeral key, needed to decrypt the payload
    pub ephem_pub_key: CompressedPoint,
    /// Announced view tag
    pub view_tag: u8,
    /// Raw metadata bytes
    pub metadata: Vec<u8>,
    /// Parsed metadata, `None` when foreign or malformed
    pub decoded_metadata: Option<AnnouncementMetadata>,
    /// Block of the announcement
    pub block_number: u64,
    /// Log index within the block
    pub log_index: u64,
    /// Announcing transaction
    pub transaction_hash: TxHash,
}

impl ScanMatch {
    /// Payload hash from metadata, if any.
    pub fn payload_hash(&self) -> Option<PayloadHash> {
        self.decoded_metadata.as_ref().and_then(AnnouncementMetadata::payload_hash)
    }

    /// Message identity: payload hash, else `<txHash>-<logIndex>`.
    pub fn message_id(&self) -> String {
        message_id(self.payload_hash().as_ref(), &self.transaction_hash, self.log_index)
    }
}

/// Why a log was not a match. Diagnostic only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDebugEntry {
    /// Announcing transaction
    pub transaction_hash: TxHash,
    /// Block of the announcement
    pub block_number: u64,
    /// Log index within the block
    pub log_index: u64,
    /// Short reason
    pub reason: String,
}

/// Result of one scan.
#[derive(Clone, Debug, Default)]
pub struct ScanOutcome {
    /// Every log returned by the source
    pub logs: Vec<Announcement>,
    /// Verified matches, in log order
    pub matches: Vec<ScanMatch>,
    /// One entry per rejected log
    pub debug_info: Vec<ScanDebugEntry>,
    /// Counters for this scan
    pub stats: ScanStats,
}

impl ScanOutcome {
    /// Highest block among the returned logs.
    pub fn max_block(&self) -> Option<u64> {
        self.logs.iter().map(|log| log.block_number).max()
    }
}

/// Scans a [`LogSource`] for a recipient's announcements.
pub struct AnnouncementScanner {
    log_source: Arc<dyn LogSource>,
    config: ScannerConfig,
    stats: RwLock<ScanStats>,
}

impl AnnouncementScanner {
    /// Creates a scanner with default configuration.
    pub fn new(log_source: Arc<dyn LogSource>) -> Self {
        Self::with_config(log_source, ScannerConfig::default())
    }

    /// Creates a scanner with custom configuration.
    pub fn with_config(log_source: Arc<dyn LogSource>, config: ScannerConfig) -> Self {
        Self {
            log_source,
            config,
            stats: RwLock::new(ScanStats::new()),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Cumulative statistics over every scan so far.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets cumulative statistics.
    pub fn reset_stats(&self) {
        *self.stats.write() = ScanStats::new();
    }

    /// Scans `[from_block, to_block]` for announcements addressed to `keys`.
    ///
    /// # Errors
    /// Only a failure of the log query itself. Individual logs never fail a
    /// scan; they end up in `debug_info`.
    #[instrument(skip(self, keys))]
    pub async fn scan(&self, keys: &RecipientKeys, from_block: u64) -> Result<ScanOutcome> {
        self.scan_inner(keys, from_block, None).await
    }

    /// Like [`AnnouncementScanner::scan`], reporting progress every 100 logs
    /// and once at the end.
    #[instrument(skip(self, keys, progress_callback))]
    pub async fn scan_with_progress(
        &self,
        keys: &RecipientKeys,
        from_block: u64,
        progress_callback: ProgressCallback,
    ) -> Result<ScanOutcome> {
        self.scan_inner(keys, from_block, Some(progress_callback)).await
    }

    async fn scan_inner(
        &self,
        keys: &RecipientKeys,
        from_block: u64,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ScanOutcome> {
        let start = Instant::now();

        let logs = self
            .log_source
            .get_logs(
                &self.config.registry_address,
                &self.config.event_signature,
                from_block,
                self.config.to_block,
            )
            .await?;

        info!(from_block, logs = logs.len(), "Starting scan");

        let mut progress = ScanProgress::new(logs.len() as u64);
        let mut outcome = ScanOutcome::default();

        for log in &logs {
            let result = self.scan_one(log, keys);
            outcome.stats.record(&result);

            match result {
                ScanResult::Matched(recovered) => {
                    debug!(tx = %log.transaction_hash, log_index = log.log_index, "Announcement matched");
                    // check_announcement already parsed the key; this cannot fail.
                    if let Ok(ephem_pub_key) = CompressedPoint::from_bytes(&log.ephemeral_pub_key) {
                        outcome.matches.push(ScanMatch {
                            stealth_address: recovered.stealth_address,
                            stealth_priv_key: recovered.stealth_priv_key,
                            ephem_pub_key,
                            view_tag: log.view_tag,
                            metadata: log.metadata.clone(),
                            decoded_metadata: AnnouncementMetadata::decode(&log.metadata),
                            block_number: log.block_number,
                            log_index: log.log_index,
                            transaction_hash: log.transaction_hash,
                        });
                    }
                }
                other => {
                    outcome.debug_info.push(ScanDebugEntry {
                        transaction_hash: log.transaction_hash,
                        block_number: log.block_number,
                        log_index: log.log_index,
                        reason: other.reason(),
                    });
                }
            }

            let scanned = outcome.stats.total_scanned;
            if let Some(callback) = &progress_callback {
                if scanned % 100 == 0 {
                    progress.update(scanned, outcome.matches.len() as u64);
                    callback(progress.clone());
                }
            }
        }

        outcome.stats.duration_ms = start.elapsed().as_millis() as u64;
        outcome.logs = logs;

        if let Some(callback) = &progress_callback {
            progress.update(outcome.stats.total_scanned, outcome.matches.len() as u64);
            callback(progress);
        }

        self.merge_stats(&outcome.stats);

        info!(
            matches = outcome.matches.len(),
            scanned = outcome.stats.total_scanned,
            view_tag_matches = outcome.stats.view_tag_matches,
            duration_ms = outcome.stats.duration_ms,
            rate = format!("{:.2}/s", outcome.stats.rate()),
            "Scan complete"
        );

        Ok(outcome)
    }

    /// Checks a single announcement without querying the log source.
    pub fn scan_one(&self, announcement: &Announcement, keys: &RecipientKeys) -> ScanResult {
        check_announcement(announcement, keys)
    }

    fn merge_stats(&self, scan: &ScanStats) {
        let mut stats = self.stats.write();
        stats.total_scanned += scan.total_scanned;
        stats.view_tag_matches += scan.view_tag_matches;
        stats.discoveries += scan.discoveries;
        stats.address_mismatches += scan.address_mismatches;
        stats.errors += scan.errors;
        stats.duration_ms += scan.duration_ms;
    }
}

/// Scan result summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Number of view tag matches
    pub view_tag_matches: u64,
    /// Number of verified matches
    pub discoveries: u64,
    /// Tag collisions caught by the address check
    pub address_mismatches: u64,
    /// Number of malformed announcements
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% filtered by view tag)
    pub filter_efficiency: f64,
}

impl From<ScanStats> for ScanSummary {
    fn from(stats: ScanStats) -> Self {
        Self {
            total_scanned: stats.total_scanned,
            view_tag_matches: stats.view_tag_matches,
            discoveries: stats.discoveries,
            address_mismatches: stats.address_mismatches,
            errors: stats.errors,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephereum_core::error::EphereumError;
    use ephereum_registry::MemoryRegistry;
    use ephereum_stealth::derive_sender_stealth_address;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn setup() -> (RecipientKeys, Arc<MemoryRegistry>, AnnouncementScanner) {
        let keys = RecipientKeys::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(7));
        let registry = Arc::new(MemoryRegistry::new());
        let scanner = AnnouncementScanner::new(registry.clone());
        (keys, registry, scanner)
    }

    fn announce(registry: &MemoryRegistry, keys: &RecipientKeys, block: u64, index: u64, metadata: Vec<u8>) -> Announcement {
        let mut tx = [0u8; 32];
        tx[..8].copy_from_slice(&block.to_be_bytes());
        tx[8..16].copy_from_slice(&index.to_be_bytes());

        let mut ann = derive_sender_stealth_address(&keys.meta_address(), None)
            .unwrap()
            .announcement(metadata);
        ann.block_number = block;
        ann.log_index = index;
        ann.transaction_hash = TxHash::from_array(tx);
        registry.publish_bare(ann.clone());
        ann
    }

    #[tokio::test]
    async fn test_scan_empty_source() {
        let (keys, _, scanner) = setup();
        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert!(outcome.logs.is_empty());
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.max_block(), None);
    }

    #[tokio::test]
    async fn test_scan_finds_own_announcement() {
        let (keys, registry, scanner) = setup();
        let hash = PayloadHash::from_array([0xAB; 32]);
        let metadata = AnnouncementMetadata::v1(Some(&hash)).encode().unwrap();
        let ann = announce(&registry, &keys, 42, 3, metadata);

        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);

        let found = &outcome.matches[0];
        assert_eq!(found.stealth_address, ann.recipient_stealth_address);
        assert_eq!(found.block_number, 42);
        assert_eq!(found.log_index, 3);
        assert_eq!(found.payload_hash(), Some(hash));
        assert_eq!(found.message_id(), hash.to_hex());
    }

    #[tokio::test]
    async fn test_scan_ignores_other_recipients() {
        let (keys, registry, scanner) = setup();
        let other = RecipientKeys::generate();

        announce(&registry, &keys, 1, 0, Vec::new());
        for i in 0..10 {
            announce(&registry, &other, 2, i, Vec::new());
        }

        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert_eq!(outcome.logs.len(), 11);
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.debug_info.len(), 10);
        assert_eq!(outcome.max_block(), Some(2));
    }

    #[tokio::test]
    async fn test_fabricated_view_tag_is_rejected() {
        let (keys, registry, scanner) = setup();
        let sent = derive_sender_stealth_address(&keys.meta_address(), None).unwrap();
        let mut ann = sent.announcement(Vec::new());
        ann.view_tag = if sent.view_tag == 0xFF { 0xFE } else { 0xFF };
        registry.publish_bare(ann);

        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.debug_info[0].reason, "view tag mismatch");
    }

    #[tokio::test]
    async fn test_garbage_metadata_still_matches() {
        let (keys, registry, scanner) = setup();
        announce(&registry, &keys, 5, 0, b"\x00\x01garbage".to_vec());

        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert!(outcome.matches[0].decoded_metadata.is_none());
        assert!(outcome.matches[0].message_id().ends_with("-0"));
    }

    #[tokio::test]
    async fn test_scan_respects_from_block() {
        let (keys, registry, scanner) = setup();
        announce(&registry, &keys, 10, 0, Vec::new());
        announce(&registry, &keys, 20, 0, Vec::new());

        let outcome = scanner.scan(&keys, 11).await.unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].block_number, 20);
        assert_eq!(registry.queries()[0].from_block, 11);
    }

    #[tokio::test]
    async fn test_log_source_failure_propagates() {
        let (keys, registry, scanner) = setup();
        registry.set_unavailable(true);

        let err = scanner.scan(&keys, 0).await.unwrap_err();
        assert!(matches!(err, EphereumError::TransientUnavailable(_)));
    }

    #[tokio::test]
    async fn test_scan_checks_every_fetched_log() {
        let (keys, registry, scanner) = setup();
        for i in 0..5 {
            announce(&registry, &keys, 1 + i, 0, Vec::new());
        }

        let outcome = scanner.scan(&keys, 0).await.unwrap();
        assert_eq!(outcome.logs.len(), 5);
        assert_eq!(outcome.matches.len(), 5);
        assert_eq!(outcome.stats.total_scanned, 5);
        assert_eq!(outcome.max_block(), Some(5));
    }

    #[tokio::test]
    async fn test_cumulative_stats() {
        let (keys, registry, scanner) = setup();
        announce(&registry, &keys, 1, 0, Vec::new());
        announce(&registry, &RecipientKeys::generate(), 1, 1, Vec::new());

        scanner.scan(&keys, 0).await.unwrap();
        scanner.scan(&keys, 0).await.unwrap();

        let stats = scanner.stats();
        assert_eq!(stats.total_scanned, 4);
        assert_eq!(stats.discoveries, 2);

        let summary = ScanSummary::from(stats);
        assert_eq!(summary.discoveries, 2);

        scanner.reset_stats();
        assert_eq!(scanner.stats().total_scanned, 0);
    }

    #[tokio::test]
    async fn test_scan_progress_callback() {
        let (keys, registry, scanner) = setup();
        for i in 0..150 {
            announce(&registry, &keys, 1, i, Vec::new());
        }

        let updates = Arc::new(RwLock::new(Vec::new()));
        let sink = updates.clone();
        let callback: ProgressCallback = Box::new(move |progress| sink.write().push(progress));

        scanner.scan_with_progress(&keys, 0, callback).await.unwrap();

        let updates = updates.read();
        assert_eq!(updates.len(), 2);
        let last = updates.last().unwrap();
        assert!(last.percent >= 99.0);
        assert_eq!(last.matches, 150);
    }

    #[test]
    fn test_default_config_targets_envelope_registry() {
        let config = ScannerConfig::default();
        assert!(!config.registry_address.is_zero());
        assert_eq!(config.to_block, BlockTag::Latest);
        assert_eq!(config.event_signature, message_envelope_topic());
    }
}
