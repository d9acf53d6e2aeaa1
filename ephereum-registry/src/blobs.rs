//! Blob stores.
//!
//! - [`MemoryBlobStore`]: dashmap-backed, for tests and demos
//! - [`DirBlobStore`]: reads `<dir>/<0x-tx-hash>` files, used by the CLI
//!
//! Both return `None` for anything they cannot serve. The sync engine never
//! distinguishes "not yet" from "never".

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use ephereum_core::error::{EphereumError, Result};
use ephereum_core::traits::BlobStore;
use ephereum_core::types::TxHash;

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory blob store keyed by transaction hash.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<TxHash, Vec<u8>>,
    fetches: AtomicU64,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the blob bytes for a transaction.
    pub fn put(&self, tx_hash: TxHash, bytes: Vec<u8>) {
        self.blobs.insert(tx_hash, bytes);
    }

    /// Removes a blob, e.g. to simulate expiry.
    pub fn remove(&self, tx_hash: &TxHash) -> Option<Vec<u8>> {
        self.blobs.remove(tx_hash).map(|(_, bytes)| bytes)
    }

    /// Number of `fetch_blob` calls served so far, hits and misses.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if no blob is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch_blob(&self, tx_hash: &TxHash) -> Option<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs.get(tx_hash).map(|entry| entry.value().clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Blob store over a directory of `<0x-tx-hash>` files.
#[derive(Clone, Debug)]
pub struct DirBlobStore {
    dir: PathBuf,
}

impl DirBlobStore {
    /// Creates a store rooted at `dir`. The directory need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding a transaction's blobs.
    pub fn path_for(&self, tx_hash: &TxHash) -> PathBuf {
        self.dir.join(tx_hash.to_hex())
    }

    /// Writes a transaction's blob bytes, creating the directory if needed.
    pub async fn write(&self, tx_hash: &TxHash, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| EphereumError::InternalError(format!("create {}: {}", self.dir.display(), e)))?;
        tokio::fs::write(self.path_for(tx_hash), bytes)
            .await
            .map_err(|e| EphereumError::InternalError(format!("write blob: {}", e)))
    }
}

#[async_trait]
impl BlobStore for DirBlobStore {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn fetch_blob(&self, tx_hash: &TxHash) -> Option<Vec<u8>> {
        match tokio::fs::read(self.path_for(tx_hash)).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(error = %e, "Blob not available");
                None
            }
        }
    }
}
