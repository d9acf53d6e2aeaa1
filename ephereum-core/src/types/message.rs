//! Materialized mailbox types.
//!
//! [`ChatMessage`] is the local view of one announcement: decrypted when the
//! blob was available, a placeholder otherwise. [`PendingAnnouncement`] is
//! the retry queue entry for placeholders. [`SyncWatermark`] tracks how far
//! an identity has scanned.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{EthAddress, PayloadHash, TxHash};

/// Message direction relative to the local identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received through a stealth announcement
    Inbound,
    /// Sent by one of the local accounts
    Outbound,
}

/// A materialized chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Payload hash when known, else `<txHash>-<logIndex>`
    pub id: String,
    /// Thread the message belongs to
    pub thread_id: String,
    /// Plaintext content or a placeholder
    pub content: String,
    /// Unix milliseconds (block time when known)
    pub created_at: i64,
    /// Inbound or outbound
    pub direction: Direction,
    /// Announcing transaction
    pub transaction_hash: TxHash,
    /// Transaction sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<EthAddress>,
    /// Stealth recipient address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<EthAddress>,
    /// False while the payload has not been decrypted
    pub content_available: bool,
    /// keccak256 of the encrypted frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<PayloadHash>,
    /// Block of the announcement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Log index of the announcement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
}

impl ChatMessage {
    /// Merges a newer version of the same message into this one.
    ///
    /// Required fields are replaced. Optional fields are replaced only when
    /// the update carries a value, so a known sender is never erased.
    pub fn merge(&mut self, update: ChatMessage) {
        self.id = update.id;
        self.thread_id = update.thread_id;
        self.content = update.content;
        self.created_at = update.created_at;
        self.direction = update.direction;
        self.transaction_hash = update.transaction_hash;
        self.content_available = update.content_available;

        if update.sender.is_some() {
            self.sender = update.sender;
        }
        if update.recipient.is_some() {
            self.recipient = update.recipient;
        }
        if update.payload_hash.is_some() {
            self.payload_hash = update.payload_hash;
        }
        if update.block_number.is_some() {
            self.block_number = update.block_number;
        }
        if update.log_index.is_some() {
            self.log_index = update.log_index;
        }
    }

    /// Display order: newest first, messages without a chain position last.
    pub fn display_order(a: &ChatMessage, b: &ChatMessage) -> Ordering {
        cmp_nullable_desc(a.block_number, b.block_number)
            .then_with(|| cmp_nullable_desc(a.log_index, b.log_index))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Processing order: the exact reverse of [`ChatMessage::display_order`].
    pub fn processing_order(a: &ChatMessage, b: &ChatMessage) -> Ordering {
        Self::display_order(b, a)
    }
}

fn cmp_nullable_desc(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => b.cmp(&a),
    }
}

/// Identity of a message: its payload hash, or `<txHash>-<logIndex>`.
pub fn message_id(payload_hash: Option<&PayloadHash>, transaction_hash: &TxHash, log_index: u64) -> String {
    match payload_hash {
        Some(hash) => hash.to_hex(),
        None => format!("{}-{}", transaction_hash.to_hex(), log_index),
    }
}

/// A matched announcement whose payload is not yet decrypted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAnnouncement {
    /// Same id as the placeholder message
    pub id: String,
    /// Announcing transaction (the blob lookup key)
    pub transaction_hash: TxHash,
    /// Sender's ephemeral public key
    #[serde(with = "hex")]
    pub ephem_pub_key: Vec<u8>,
    /// Announced view tag
    pub view_tag: u8,
    /// Payload hash from metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<PayloadHash>,
    /// Block of the announcement
    pub block_number: u64,
    /// Log index of the announcement
    pub log_index: u64,
    /// Stealth recipient address
    pub recipient: EthAddress,
    /// Transaction sender, when the lookup succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<EthAddress>,
    /// Unix milliseconds of the placeholder
    pub created_at: i64,
    /// Last failure reason; `None` means "blob not available yet"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Highest block already scanned for one identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWatermark {
    /// `None` until the first completed scan observes a log
    pub last_synced_block: Option<u64>,
}

impl SyncWatermark {
    /// First block the next scan should query.
    pub fn next_from_block(&self) -> u64 {
        self.last_synced_block.map_or(0, |block| block.saturating_add(1))
    }

    /// Folds observed block numbers in. Never moves backwards.
    pub fn advance<I>(&mut self, observed: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for block in observed {
            self.last_synced_block = Some(match self.last_synced_block {
                Some(current) => current.max(block),
                None => block,
            });
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGE TTL
// ═══════════════════════════════════════════════════════════════════════════════

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// True when a message created at `created_at_ms` has outlived `ttl_ms`.
///
/// A non-positive TTL counts as already expired.
pub fn is_message_expired(created_at_ms: i64, ttl_ms: i64, now_ms: i64) -> bool {
    if ttl_ms <= 0 {
        return true;
    }
    now_ms >= created_at_ms.saturating_add(ttl_ms)
}

/// Expiry instant in unix milliseconds, or `None` for a non-positive TTL.
pub fn message_expiry(created_at_ms: i64, ttl_ms: i64) -> Option<i64> {
    if ttl_ms <= 0 {
        return None;
    }
    Some(created_at_ms.saturating_add(ttl_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn message(id: &str, block: Option<u64>, log: Option<u64>, created_at: i64) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            thread_id: "t".into(),
            content: "c".into(),
            created_at,
            direction: Direction::Inbound,
            transaction_hash: TxHash::default(),
            sender: None,
            recipient: None,
            content_available: true,
            payload_hash: None,
            block_number: block,
            log_index: log,
        }
    }

    #[test]
    fn test_display_order_newest_first_nulls_last() {
        let mut msgs = vec![
            message("a", Some(1), Some(0), 10),
            message("b", None, None, 50),
            message("c", Some(5), Some(1), 20),
            message("d", Some(5), Some(2), 5),
        ];
        msgs.sort_by(ChatMessage::display_order);
        let ids: Vec<_> = msgs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["d", "c", "a", "b"]);

        msgs.sort_by(ChatMessage::processing_order);
        let ids: Vec<_> = msgs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c", "d"]);
    }

    #[test]
    fn test_merge_keeps_known_optionals() {
        let mut existing = message("x", Some(3), Some(1), 10);
        existing.sender = Some(EthAddress::from_array([9; 20]));
        existing.content_available = false;

        let mut update = message("x", None, None, 10);
        update.content = "hello".into();
        existing.merge(update);

        assert_eq!(existing.content, "hello");
        assert!(existing.content_available);
        assert_eq!(existing.sender, Some(EthAddress::from_array([9; 20])));
        assert_eq!(existing.block_number, Some(3));
    }

    #[test]
    fn test_message_id_fallback() {
        let tx = TxHash::from_array([0xAA; 32]);
        let hash = PayloadHash::from_array([0xBB; 32]);
        assert_eq!(message_id(Some(&hash), &tx, 4), hash.to_hex());
        assert_eq!(message_id(None, &tx, 4), format!("{}-4", tx.to_hex()));
    }

    #[test]
    fn test_watermark_is_monotonic() {
        let mut wm = SyncWatermark::default();
        assert_eq!(wm.next_from_block(), 0);

        wm.advance([90, 100, 95]);
        assert_eq!(wm.last_synced_block, Some(100));
        assert_eq!(wm.next_from_block(), 101);

        wm.advance([50]);
        assert_eq!(wm.last_synced_block, Some(100));

        wm.advance(std::iter::empty());
        assert_eq!(wm.last_synced_block, Some(100));
    }

    #[test_case(0, 100, 50 => false ; "inside window")]
    #[test_case(0, 100, 100 => true ; "exactly at expiry")]
    #[test_case(0, 0, 0 => true ; "zero ttl")]
    #[test_case(0, -5, 0 => true ; "negative ttl")]
    fn test_is_message_expired(created: i64, ttl: i64, now: i64) -> bool {
        is_message_expired(created, ttl, now)
    }

    #[test]
    fn test_message_expiry() {
        assert_eq!(message_expiry(1_000, 500), Some(1_500));
        assert_eq!(message_expiry(1_000, 0), None);
        assert_eq!(
            message_expiry(0, crate::constants::BLOB_RETENTION_MS),
            Some(1_555_200_000)
        );
    }
}
