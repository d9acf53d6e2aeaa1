//! Protocol constants for Ephereum.
//!
//! Sizes follow secp256k1 and the ERC-5564 scheme 2 meta-address layout.
//! Contract addresses and HKDF contexts are part of the wire format and
//! must not change without a protocol version bump.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a secp256k1 private scalar in bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Size of a SEC1 compressed point (parity prefix + x-coordinate).
pub const COMPRESSED_POINT_SIZE: usize = 33;

/// Size of a SEC1 uncompressed point (0x04 prefix + x + y).
pub const UNCOMPRESSED_POINT_SIZE: usize = 65;

/// Size of the ECDH shared secret (x-coordinate only).
pub const SHARED_SECRET_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// The only supported stealth scheme (secp256k1 with view tags).
pub const STEALTH_SCHEME_ID: u8 = 0x02;

/// Encoded meta-address size: scheme (1) + spend pub (33) + view pub (33).
pub const META_ADDRESS_SIZE: usize = 1 + COMPRESSED_POINT_SIZE + COMPRESSED_POINT_SIZE;

/// Length of the `0x`-less hex form of an encoded meta-address.
pub const META_ADDRESS_HEX_LEN: usize = META_ADDRESS_SIZE * 2;

/// Optional human-readable prefix (`scheme:chain:`) on meta-address strings.
pub const META_ADDRESS_PREFIX: &str = "st:eth:";

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW TAG
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of view tag in bytes.
/// One byte rejects 255 of every 256 foreign announcements before curve work.
pub const VIEW_TAG_SIZE: usize = 1;

/// Number of possible view tag values.
pub const VIEW_TAG_SPACE: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// SYMMETRIC ENCRYPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// XChaCha20-Poly1305 nonce size.
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size produced by HKDF.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Poly1305 tag size appended to every ciphertext.
pub const AEAD_TAG_SIZE: usize = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// HKDF CONTEXTS
// ═══════════════════════════════════════════════════════════════════════════════
// Each purpose gets its own info string so one input never yields
// interchangeable keys across purposes.

/// HKDF info for message payload encryption.
pub const MESSAGE_ENCRYPTION_CONTEXT: &str = "stealth-chat-v1";

/// HKDF info for deriving the view private key from a wallet signature.
pub const VIEW_KEY_CONTEXT: &str = "ephereum-view-key-v1";

/// HKDF info for deriving the spend private key from a wallet signature.
pub const SPEND_KEY_CONTEXT: &str = "ephereum-spend-key-v1";

// ═══════════════════════════════════════════════════════════════════════════════
// PAYLOAD VERSIONING
// ═══════════════════════════════════════════════════════════════════════════════

/// Version tag of the JSON message payload.
pub const PAYLOAD_VERSION: &str = "v1";

/// Version tag of announcement metadata.
pub const METADATA_VERSION: &str = "v1";

/// Content type of chat payloads.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of Ethereum address in bytes.
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Size of keccak256 hash output.
pub const KECCAK256_SIZE: usize = 32;

/// Message envelope registry emitting `MessageEnvelope` events.
pub const MESSAGE_ENVELOPE_REGISTRY: &str = "0xe42A8d79AE1e4bbA02F753c592C43941f442c9A7";

/// ERC-6538 stealth meta-address registry.
pub const ERC6538_REGISTRY: &str = "0x6538E6bf4B0eBd30A8Ea093027Ac2422ce5d6538";

/// Announcement event signature.
pub const MESSAGE_ENVELOPE_EVENT: &str = "MessageEnvelope(address,bytes,bytes1,bytes)";

/// Announce function signature.
pub const ANNOUNCE_FUNCTION: &str = "announce(address,bytes,bytes1,bytes)";

/// ERC-6538 lookup function signature.
pub const STEALTH_META_ADDRESS_OF_FUNCTION: &str = "stealthMetaAddressOf(address,uint256)";

// ═══════════════════════════════════════════════════════════════════════════════
// BLOBS (EIP-4844)
// ═══════════════════════════════════════════════════════════════════════════════

/// Field elements per blob.
pub const FIELD_ELEMENTS_PER_BLOB: usize = 4096;

/// Bytes per field element.
pub const BYTES_PER_FIELD_ELEMENT: usize = 32;

/// Total bytes in one blob.
pub const BYTES_PER_BLOB: usize = FIELD_ELEMENTS_PER_BLOB * BYTES_PER_FIELD_ELEMENT;

/// Blob retention window on consensus nodes (18 days), in milliseconds.
pub const BLOB_RETENTION_MS: i64 = 18 * 24 * 60 * 60 * 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// TTL for cached log queries, in seconds.
pub const LOG_CACHE_TTL_SECONDS: u64 = 10;

/// TTL for cached registry lookups, in seconds.
pub const REGISTRY_CACHE_TTL_SECONDS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// MAILBOX PLACEHOLDERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread used when the sender leaves the subject blank.
pub const DEFAULT_THREAD_ID: &str = "No subject";

/// Thread shown for a decrypted message with an empty thread id.
pub const UNTITLED_THREAD_ID: &str = "Untitled";

/// Thread of a placeholder whose blob is not available yet.
pub const LOADING_THREAD_ID: &str = "Loading...";

/// Content of a placeholder whose blob is not available yet.
pub const LOADING_CONTENT: &str = "Loading encrypted payload...";

/// Thread of a placeholder that could not be decrypted, or of an outbound
/// message without a payload hash.
pub const ENCRYPTED_THREAD_ID: &str = "Encrypted";

/// Content of a placeholder that could not be decrypted.
pub const UNDECRYPTABLE_CONTENT: &str = "Encrypted content (pending decryption).";

/// Content of outbound history, which only the recipient can read.
pub const OUTBOUND_CONTENT: &str = "Encrypted content (recipient-only).";

/// Prefix of the thread id of outbound messages, followed by the payload hash.
pub const ENCRYPTED_THREAD_PREFIX: &str = "enc:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_address_size() {
        // scheme (1) + spend (33) + view (33)
        assert_eq!(META_ADDRESS_SIZE, 67);
        assert_eq!(META_ADDRESS_HEX_LEN, 134);
    }

    #[test]
    fn test_blob_sizes() {
        assert_eq!(BYTES_PER_BLOB, 131_072);
        assert_eq!(BLOB_RETENTION_MS, 1_555_200_000);
    }

    #[test]
    fn test_hkdf_contexts_unique() {
        let contexts = [MESSAGE_ENCRYPTION_CONTEXT, VIEW_KEY_CONTEXT, SPEND_KEY_CONTEXT];

        for (i, a) in contexts.iter().enumerate() {
            for (j, b) in contexts.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "HKDF contexts must be unique");
                }
            }
        }
    }
}
