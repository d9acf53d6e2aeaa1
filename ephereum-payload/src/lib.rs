//! # Ephereum Payload
//!
//! Everything that travels in a blob, plus the announcement metadata that
//! points at it.
//!
//! - [`message`]: the JSON message payload and its encryption to a view key
//! - [`frame`]: `nonce ‖ ciphertext` framing and the payload hash
//! - [`metadata`]: `{"version":"v1","payloadHash":…}` announcement metadata
//! - [`blob`]: EIP-4844 blob packing
//! - [`outgoing`]: one-call preparation of an outbound message
//!
//! ## Example
//!
//! ```rust,ignore
//! use ephereum_payload::{decrypt_message, decode_blob_payload, prepare_message};
//!
//! let envelope = prepare_message(&bob_meta, "gm", "")?;
//! // ... announce envelope.calldata with envelope.blobs attached ...
//!
//! let frame = decode_blob_payload(&fetched);
//! let payload = decrypt_message(&frame, &bob_view_priv, &envelope.ephemeral_pub_key)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod blob;
pub mod frame;
pub mod message;
pub mod metadata;
pub mod outgoing;

pub use blob::{decode_blob_payload, from_blobs, is_blob_encoded, to_blobs, MAX_BLOBS_PER_TRANSACTION};
pub use frame::{decode_frame, encode_frame, payload_hash, EncryptedPayload};
pub use message::{build_message, decrypt_message, decrypt_payload, encrypt_message, MessagePayload};
pub use metadata::{is_payload_hash, AnnouncementMetadata};
pub use outgoing::{prepare_message, prepare_message_with_ephemeral, OutgoingEnvelope};
