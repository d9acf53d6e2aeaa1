//! Batch lookups against a [`LogSource`].
//!
//! Keys are deduplicated and looked up concurrently. A failed lookup only
//! drops its own key from the result.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use futures::future::join_all;
use tracing::warn;

use ephereum_core::traits::LogSource;
use ephereum_core::types::{EthAddress, TxHash};

fn unique<K: Eq + Hash + Copy>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|key| seen.insert(*key)).collect()
}

/// Transaction hash → `from` address.
pub async fn lookup_senders(
    source: &dyn LogSource,
    tx_hashes: impl IntoIterator<Item = TxHash>,
) -> HashMap<TxHash, EthAddress> {
    let hashes = unique(tx_hashes);
    let results = join_all(hashes.iter().map(|hash| source.get_transaction_sender(hash))).await;

    hashes
        .into_iter()
        .zip(results)
        .filter_map(|(hash, result)| match result {
            Ok(sender) => Some((hash, sender)),
            Err(e) => {
                warn!(tx = %hash, error = %e, "Sender lookup failed");
                None
            }
        })
        .collect()
}

/// Block number → timestamp in unix milliseconds.
pub async fn lookup_timestamps(
    source: &dyn LogSource,
    block_numbers: impl IntoIterator<Item = u64>,
) -> HashMap<u64, i64> {
    let blocks = unique(block_numbers);
    let results = join_all(blocks.iter().map(|block| source.get_block_timestamp(*block))).await;

    blocks
        .into_iter()
        .zip(results)
        .filter_map(|(block, result)| match result {
            Ok(timestamp) => Some((block, timestamp)),
            Err(e) => {
                warn!(block, error = %e, "Timestamp lookup failed");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use ephereum_core::error::{EphereumError, Result};
    use ephereum_core::traits::BlockTag;
    use ephereum_core::types::{Announcement, H256};

    /// Knows even block numbers and tx hashes starting with 0x01; counts calls.
    #[derive(Default)]
    struct PartialSource {
        calls: AtomicU64,
    }

    #[async_trait]
    impl LogSource for PartialSource {
        async fn get_logs(&self, _: &EthAddress, _: &H256, _: u64, _: BlockTag) -> Result<Vec<Announcement>> {
            Ok(Vec::new())
        }

        async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if tx_hash.as_bytes()[0] == 0x01 {
                Ok(EthAddress::from_array([0xAA; 20]))
            } else {
                Err(EphereumError::RpcError("transaction not found".into()))
            }
        }

        async fn get_block_timestamp(&self, block_number: u64) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if block_number % 2 == 0 {
                Ok(block_number as i64 * 1000)
            } else {
                Err(EphereumError::HttpError("timeout".into()))
            }
        }
    }

    #[tokio::test]
    async fn test_senders_dedupe_and_omit_failures() {
        let source = PartialSource::default();
        let known = TxHash::from_array([0x01; 32]);
        let unknown = TxHash::from_array([0x02; 32]);

        let senders = lookup_senders(&source, [known, unknown, known, known]).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[&known], EthAddress::from_array([0xAA; 20]));
    }

    #[tokio::test]
    async fn test_timestamps_dedupe_and_omit_failures() {
        let source = PartialSource::default();

        let timestamps = lookup_timestamps(&source, [2, 3, 2, 4]).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(timestamps.len(), 2);
        assert_eq!(timestamps[&4], 4000);
        assert!(!timestamps.contains_key(&3));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let source = PartialSource::default();
        assert!(lookup_senders(&source, []).await.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
