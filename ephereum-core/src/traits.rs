//! Collaborator traits for Ephereum.
//!
//! The core never talks to a chain or a blob index directly. These traits
//! are the narrow seams it consumes; `ephereum-registry` provides in-memory,
//! JSON-RPC and cached implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Announcement, EthAddress, MetaAddress, TxHash, H256};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Upper bound of a log query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// Chain head at query time
    Latest,
    /// A specific block
    Number(u64),
}

impl BlockTag {
    /// JSON-RPC quantity form (`"latest"` or `0x`-hex).
    pub fn to_rpc(&self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Number(n) => format!("0x{:x}", n),
        }
    }
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockTag::Latest => f.write_str("latest"),
            BlockTag::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Source of announcement logs and per-transaction/per-block metadata.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A JSON-RPC node
/// - A caching wrapper around either
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns decoded announcement logs emitted by `address` with topic0
    /// `event_signature` in `[from_block, to_block]`.
    ///
    /// An empty range yields an empty vector, never an error.
    async fn get_logs(
        &self,
        address: &EthAddress,
        event_signature: &H256,
        from_block: u64,
        to_block: BlockTag,
    ) -> Result<Vec<Announcement>>;

    /// Returns the `from` address of a transaction.
    async fn get_transaction_sender(&self, tx_hash: &TxHash) -> Result<EthAddress>;

    /// Returns a block's timestamp in unix milliseconds.
    async fn get_block_timestamp(&self, block_number: u64) -> Result<i64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOB STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Transient blob storage keyed by the announcing transaction.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the payload bytes, or `None` when they are unavailable,
    /// expired, or blocked. Callers treat `None` as "retry later".
    async fn fetch_blob(&self, tx_hash: &TxHash) -> Option<Vec<u8>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// ERC-6538 style lookup of a registrant's stealth meta-address.
#[async_trait]
pub trait MetaAddressRegistry: Send + Sync {
    /// Returns the registered meta-address, or `None` if nothing is registered.
    async fn stealth_meta_address_of(
        &self,
        registrant: &EthAddress,
        scheme_id: u64,
    ) -> Result<Option<MetaAddress>>;
}
