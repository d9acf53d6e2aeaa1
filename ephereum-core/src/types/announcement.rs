//! Announcement records read from the message-envelope registry.
//!
//! Senders emit one `MessageEnvelope` event per message. The event carries
//! the stealth address, the sender's ephemeral public key, a one-byte view
//! tag, and opaque metadata. Every scanner reads every announcement.

use serde::{Deserialize, Serialize};

use super::{EthAddress, TxHash};
use crate::constants::COMPRESSED_POINT_SIZE;
use crate::error::{EphereumError, Result};

/// A decoded `MessageEnvelope` log.
///
/// `ephemeral_pub_key` and `metadata` stay raw bytes: the log is public and
/// may carry garbage from other protocol versions sharing the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// Stealth address the sender derived for the recipient
    pub recipient_stealth_address: EthAddress,
    /// Sender's ephemeral public key (33-byte compressed point when well-formed)
    #[serde(with = "hex")]
    pub ephemeral_pub_key: Vec<u8>,
    /// First byte of keccak256 of the shared secret
    pub view_tag: u8,
    /// Advisory metadata (JSON bytes, may be empty)
    #[serde(with = "hex")]
    pub metadata: Vec<u8>,
    /// Block the log was included in
    pub block_number: u64,
    /// Position of the log within the block
    pub log_index: u64,
    /// Transaction that emitted the log
    pub transaction_hash: TxHash,
}

impl Announcement {
    /// Starts building an announcement.
    pub fn builder(recipient_stealth_address: EthAddress, ephemeral_pub_key: Vec<u8>, view_tag: u8) -> AnnouncementBuilder {
        AnnouncementBuilder::new(recipient_stealth_address, ephemeral_pub_key, view_tag)
    }

    /// Checks the ephemeral key has compressed-point length.
    pub fn validate(&self) -> Result<()> {
        if self.ephemeral_pub_key.len() != COMPRESSED_POINT_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: COMPRESSED_POINT_SIZE,
                actual: self.ephemeral_pub_key.len(),
            });
        }
        Ok(())
    }

    /// `(block_number, log_index)`, the chain position of this log.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Builder for [`Announcement`], mostly used by in-memory sources and tests.
#[derive(Clone, Debug)]
pub struct AnnouncementBuilder {
    inner: Announcement,
}

impl AnnouncementBuilder {
    /// Creates a builder with empty metadata at block 0.
    pub fn new(recipient_stealth_address: EthAddress, ephemeral_pub_key: Vec<u8>, view_tag: u8) -> Self {
        Self {
            inner: Announcement {
                recipient_stealth_address,
                ephemeral_pub_key,
                view_tag,
                metadata: Vec::new(),
                block_number: 0,
                log_index: 0,
                transaction_hash: TxHash::default(),
            },
        }
    }

    /// Sets the metadata bytes.
    pub fn metadata(mut self, metadata: Vec<u8>) -> Self {
        self.inner.metadata = metadata;
        self
    }

    /// Sets the block number.
    pub fn block_number(mut self, block_number: u64) -> Self {
        self.inner.block_number = block_number;
        self
    }

    /// Sets the log index.
    pub fn log_index(mut self, log_index: u64) -> Self {
        self.inner.log_index = log_index;
        self
    }

    /// Sets the transaction hash.
    pub fn transaction_hash(mut self, transaction_hash: TxHash) -> Self {
        self.inner.transaction_hash = transaction_hash;
        self
    }

    /// Finishes the announcement.
    pub fn build(self) -> Announcement {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let tx = TxHash::from_array([7; 32]);
        let ann = Announcement::builder(EthAddress::from_array([1; 20]), vec![2; 33], 0xAB)
            .metadata(b"{}".to_vec())
            .block_number(42)
            .log_index(3)
            .transaction_hash(tx)
            .build();

        assert_eq!(ann.position(), (42, 3));
        assert_eq!(ann.transaction_hash, tx);
        assert_eq!(ann.metadata, b"{}");
        assert!(ann.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_ephemeral_key() {
        let ann = Announcement::builder(EthAddress::zero(), vec![2; 20], 0).build();
        assert!(matches!(
            ann.validate(),
            Err(EphereumError::InvalidLength { expected: 33, actual: 20 })
        ));
    }

    #[test]
    fn test_serde_camel_case() {
        let ann = Announcement::builder(EthAddress::zero(), vec![2; 33], 9).build();
        let json = serde_json::to_value(&ann).unwrap();
        assert!(json.get("recipientStealthAddress").is_some());
        assert!(json.get("viewTag").is_some());
        let back: Announcement = serde_json::from_value(json).unwrap();
        assert_eq!(back, ann);
    }
}
