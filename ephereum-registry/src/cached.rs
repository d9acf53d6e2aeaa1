//! Caching wrappers.
//!
//! Log queries are cached for a short TTL under `address-event-from-to`.
//! Transaction senders and block timestamps never change once mined, so they
//! are kept for as long as the cache has room. Registry lookups get their
//! own short TTL.
//!
//! Each wrapper owns its [`TtlCache`]; build one per session (or per test)
//! and inject it where a `LogSource` or `MetaAddressRegistry` is expected.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use ephereum_cache::{CacheConfig, CacheStats, TtlCache};
use ephereum_core::constants::{LOG_CACHE_TTL_SECONDS, REGISTRY_CACHE_TTL_SECONDS};
use ephereum_core::error::Result;
use ephereum_core::traits::{BlockTag, LogSource, MetaAddressRegistry};
use ephereum_core::types::{Announcement, EthAddress, MetaAddress, TxHash, H256};

/// Cache key for a log query.
pub fn log_cache_key(address: &EthAddress, event_signature: &H256, from_block: u64, to_block: BlockTag) -> String {
    format!("{}-{}-{}-{}", address, event_signature, from_block, to_block)
}

/// [`LogSource`] wrapper with a TTL cache in front.
pub struct CachedLogSource {
    inner: Arc<dyn LogSource>,
    logs: TtlCache<Vec<Announcement>>,
    senders: TtlCache<EthAddress>,
    timestamps: TtlCache<i64>,
}

impl CachedLogSource {
    /// Wraps `inner` with the default log TTL.
    pub fn new(inner: Arc<dyn LogSource>) -> Self {
        Self::with_config(inner, CacheConfig::with_ttl_seconds(LOG_CACHE_TTL_SECONDS))
    }

    /// Wraps `inner` with a custom log cache configuration. The sender and
    /// timestamp caches share its capacity.
    pub fn with_config(inner: Arc<dyn LogSource>, config: CacheConfig) -> Self {
        Self {
            inner,
            senders: TtlCache::with_config(config.clone()),
            timestamps: TtlCache::with_config(config.clone()),
            logs: TtlCache::with_config(config),
        }
    }

    /// Drops every cached log query. Sender and timestamp entries stay.
    pub fn invalidate(&self) {
        self.logs.clear();
    }

    /// Statistics of the log query cache.
    pub fn stats(&self) -> CacheStats {
        self.logs.stats()
    }
}

#[async_trait]
impl LogSource for CachedLogSource {
    #[instrument(skip(self, address, event_signature))]
    async fn get_logs(
        &self,
        address: &EthAddress,
        event_signature: &H256,
        from_block: u64,
        to_block: BlockTag,
    ) -> Result<Vec<Announcement>> {
        let key = log_cache_key(address, event_signature, from_block, to_block);
        if let Some(logs) = self.logs.get(&key) {
            debug!(key, "Log cache hit");
            return Ok(logs);
        }

        let logs = self
            .inner
            .get_logs(address, event_signature, from_block, to_block)
            .await?;
        self.logs.set(key, logs.clone());
        Ok(logs)
    }

    async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress> {
        let key = tx_hash.to_hex();
        if let Some(sender) = self.senders.get(&key) {
            return Ok(sender);
        }

        let sender = self.inner.get_transaction_sender(tx_hash).await?;
        self.senders.set_permanent(key, sender);
        Ok(sender)
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<i64> {
        let key = block_number.to_string();
        if let Some(timestamp) = self.timestamps.get(&key) {
            return Ok(timestamp);
        }

        let timestamp = self.inner.get_block_timestamp(block_number).await?;
        self.timestamps.set_permanent(key, timestamp);
        Ok(timestamp)
    }
}

/// [`MetaAddressRegistry`] wrapper with a TTL cache in front.
///
/// Negative answers are cached too, so an unregistered address is not
/// re-queried on every keystroke.
pub struct CachedMetaAddressRegistry {
    inner: Arc<dyn MetaAddressRegistry>,
    cache: TtlCache<Option<MetaAddress>>,
}

impl CachedMetaAddressRegistry {
    /// Wraps `inner` with the default registry TTL.
    pub fn new(inner: Arc<dyn MetaAddressRegistry>) -> Self {
        Self::with_config(inner, CacheConfig::with_ttl_seconds(REGISTRY_CACHE_TTL_SECONDS))
    }

    /// Wraps `inner` with a custom cache configuration.
    pub fn with_config(inner: Arc<dyn MetaAddressRegistry>, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: TtlCache::with_config(config),
        }
    }

    /// Drops every cached lookup.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl MetaAddressRegistry for CachedMetaAddressRegistry {
    async fn stealth_meta_address_of(
        &self,
        registrant: &EthAddress,
        scheme_id: u64,
    ) -> Result<Option<MetaAddress>> {
        let key = format!("{}-{}", registrant, scheme_id);
        if let Some(found) = self.cache.get(&key) {
            return Ok(found);
        }

        let found = self.inner.stealth_meta_address_of(registrant, scheme_id).await?;
        self.cache.set(key, found);
        Ok(found)
    }
}
