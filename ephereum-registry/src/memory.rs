//! In-memory log source.
//!
//! Fast, thread-safe storage suitable for development and tests. Beyond
//! serving logs it records every `get_logs` range it was asked for and can
//! be switched offline, so callers can assert incremental sync and exercise
//! transient-failure paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument};

use ephereum_core::error::{EphereumError, Result};
use ephereum_core::traits::{BlockTag, LogSource};
use ephereum_core::types::{Announcement, EthAddress, TxHash, H256};

/// One `get_logs` call as seen by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogQuery {
    /// Requested lower bound
    pub from_block: u64,
    /// Requested upper bound
    pub to_block: BlockTag,
}

/// In-memory announcement log.
///
/// # Indexing
///
/// - Announcements are stored in publish order
/// - Tx hash → sender, for `get_transaction_sender`
/// - Block → timestamp, for `get_block_timestamp`
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// Published announcements
    announcements: RwLock<Vec<Announcement>>,
    /// Transaction hash → sender
    senders: DashMap<TxHash, EthAddress>,
    /// Block number → timestamp (ms)
    timestamps: DashMap<u64, i64>,
    /// Every `get_logs` range requested
    queries: Mutex<Vec<LogQuery>>,
    /// When set, every call fails with `TransientUnavailable`
    unavailable: AtomicBool,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an announcement together with its transaction sender and
    /// block timestamp.
    #[instrument(skip(self, announcement), fields(block = announcement.block_number, view_tag = announcement.view_tag))]
    pub fn publish(&self, announcement: Announcement, sender: EthAddress, timestamp_ms: i64) {
        debug!(tx = %announcement.transaction_hash, "Publishing announcement");

        self.senders.insert(announcement.transaction_hash, sender);
        self.timestamps.insert(announcement.block_number, timestamp_ms);
        self.announcements.write().push(announcement);
    }

    /// Publishes an announcement with no known sender or timestamp.
    pub fn publish_bare(&self, announcement: Announcement) {
        self.announcements.write().push(announcement);
    }

    /// Makes every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every `get_logs` range requested so far.
    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().clone()
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.announcements.read().len()
    }

    /// Returns true if nothing was published.
    pub fn is_empty(&self) -> bool {
        self.announcements.read().is_empty()
    }

    /// Highest published block, if any.
    pub fn head(&self) -> Option<u64> {
        self.announcements.read().iter().map(|a| a.block_number).max()
    }

    /// Clears all state.
    pub fn clear(&self) {
        self.announcements.write().clear();
        self.senders.clear();
        self.timestamps.clear();
        self.queries.lock().clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EphereumError::TransientUnavailable("log source offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LogSource for MemoryRegistry {
    /// Returns announcements in `[from_block, to_block]`, in chain order.
    ///
    /// The registry holds a single contract's logs, so `address` and
    /// `event_signature` are not filtered on.
    #[instrument(skip(self, _address, _event_signature))]
    async fn get_logs(
        &self,
        _address: &EthAddress,
        _event_signature: &H256,
        from_block: u64,
        to_block: BlockTag,
    ) -> Result<Vec<Announcement>> {
        self.queries.lock().push(LogQuery { from_block, to_block });
        self.check_available()?;

        let mut logs: Vec<Announcement> = self
            .announcements
            .read()
            .iter()
            .filter(|a| {
                a.block_number >= from_block
                    && match to_block {
                        BlockTag::Latest => true,
                        BlockTag::Number(to) => a.block_number <= to,
                    }
            })
            .cloned()
            .collect();
        logs.sort_by_key(|a| a.position());

        debug!(from_block, count = logs.len(), "Retrieved logs");
        Ok(logs)
    }

    async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress> {
        self.check_available()?;
        self.senders
            .get(tx_hash)
            .map(|entry| *entry.value())
            .ok_or_else(|| EphereumError::RpcError(format!("transaction {} not found", tx_hash)))
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<i64> {
        self.check_available()?;
        self.timestamps
            .get(&block_number)
            .map(|entry| *entry.value())
            .ok_or_else(|| EphereumError::RpcError(format!("block {} not found", block_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_announcement(block: u64, index: u64) -> Announcement {
        let mut tx = [0u8; 32];
        tx[..8].copy_from_slice(&block.to_be_bytes());
        tx[8..16].copy_from_slice(&index.to_be_bytes());
        Announcement::builder(EthAddress::from_array([0x42; 20]), vec![0x02; 33], 0x42)
            .block_number(block)
            .log_index(index)
            .transaction_hash(TxHash::from_array(tx))
            .build()
    }

    #[tokio::test]
    async fn test_publish_and_get_logs() {
        let registry = MemoryRegistry::new();
        let sender = EthAddress::from_array([0x01; 20]);
        registry.publish(make_announcement(10, 0), sender, 10_000);
        registry.publish(make_announcement(20, 1), sender, 20_000);

        let logs = registry
            .get_logs(&EthAddress::zero(), &H256::default(), 0, BlockTag::Latest)
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(registry.head(), Some(20));
    }

    #[tokio::test]
    async fn test_block_range_filtering() {
        let registry = MemoryRegistry::new();
        for block in [5, 10, 15, 20] {
            registry.publish_bare(make_announcement(block, 0));
        }

        let logs = registry
            .get_logs(&EthAddress::zero(), &H256::default(), 10, BlockTag::Number(15))
            .await
            .unwrap();
        let blocks: Vec<u64> = logs.iter().map(|a| a.block_number).collect();
        assert_eq!(blocks, vec![10, 15]);

        let empty = registry
            .get_logs(&EthAddress::zero(), &H256::default(), 21, BlockTag::Latest)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_logs_in_chain_order() {
        let registry = MemoryRegistry::new();
        registry.publish_bare(make_announcement(9, 1));
        registry.publish_bare(make_announcement(3, 0));
        registry.publish_bare(make_announcement(9, 0));

        let logs = registry
            .get_logs(&EthAddress::zero(), &H256::default(), 0, BlockTag::Latest)
            .await
            .unwrap();
        let positions: Vec<(u64, u64)> = logs.iter().map(|a| a.position()).collect();
        assert_eq!(positions, vec![(3, 0), (9, 0), (9, 1)]);
    }

    #[tokio::test]
    async fn test_sender_and_timestamp_lookup() {
        let registry = MemoryRegistry::new();
        let sender = EthAddress::from_array([0x07; 20]);
        let ann = make_announcement(33, 0);
        registry.publish(ann.clone(), sender, 33_000);

        assert_eq!(registry.get_transaction_sender(&ann.transaction_hash).await.unwrap(), sender);
        assert_eq!(registry.get_block_timestamp(33).await.unwrap(), 33_000);
        assert!(registry.get_block_timestamp(34).await.is_err());
    }

    #[tokio::test]
    async fn test_queries_are_recorded() {
        let registry = MemoryRegistry::new();
        let _ = registry.get_logs(&EthAddress::zero(), &H256::default(), 0, BlockTag::Latest).await;
        let _ = registry.get_logs(&EthAddress::zero(), &H256::default(), 101, BlockTag::Latest).await;

        let queries = registry.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].from_block, 101);
        assert_eq!(queries[1].to_block, BlockTag::Latest);
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let registry = MemoryRegistry::new();
        registry.publish_bare(make_announcement(1, 0));
        registry.set_unavailable(true);

        let err = registry
            .get_logs(&EthAddress::zero(), &H256::default(), 0, BlockTag::Latest)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());

        registry.set_unavailable(false);
        assert!(registry
            .get_logs(&EthAddress::zero(), &H256::default(), 0, BlockTag::Latest)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_publish() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let registry = Arc::new(MemoryRegistry::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u64 {
            let reg = registry.clone();
            tasks.spawn(async move {
                reg.publish(make_announcement(i, 0), EthAddress::zero(), i as i64);
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(registry.len(), 100);
        registry.clear();
        assert!(registry.is_empty());
    }
}
