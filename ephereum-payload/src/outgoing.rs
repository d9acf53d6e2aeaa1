//! Outbound message preparation.
//!
//! Produces everything the announce transaction needs (calldata and blobs)
//! without sending it. Submission is up to the caller's wallet.

use tracing::{debug, instrument};

use ephereum_core::constants::{DEFAULT_THREAD_ID, ENCRYPTED_THREAD_PREFIX, LOADING_CONTENT};
use ephereum_core::error::Result;
use ephereum_core::types::{
    Announcement, ChatMessage, CompressedPoint, Direction, EthAddress, KeyPair, MetaAddress, PayloadHash, TxHash,
};
use ephereum_registry::encode_announce_calldata;
use ephereum_stealth::derive_sender_stealth_address;

use crate::blob::to_blobs;
use crate::message::{build_message, encrypt_message};
use crate::metadata::AnnouncementMetadata;

/// A fully prepared message, ready to be announced.
#[derive(Clone, Debug)]
pub struct OutgoingEnvelope {
    /// One-time recipient address
    pub stealth_address: EthAddress,
    /// Published ephemeral key
    pub ephemeral_pub_key: CompressedPoint,
    /// One-byte scan filter
    pub view_tag: u8,
    /// Plaintext thread id (not published)
    pub thread_id: String,
    /// `nonce ‖ ciphertext`
    pub frame: Vec<u8>,
    /// keccak256 of `frame`
    pub payload_hash: PayloadHash,
    /// Encoded announcement metadata
    pub metadata: Vec<u8>,
    /// `announce(...)` calldata
    pub calldata: Vec<u8>,
    /// `frame` packed into EIP-4844 blobs
    pub blobs: Vec<Vec<u8>>,
}

impl OutgoingEnvelope {
    /// Thread id shown for this message in outbound history.
    pub fn encrypted_thread_id(&self) -> String {
        format!("{}{}", ENCRYPTED_THREAD_PREFIX, self.payload_hash.to_hex())
    }

    /// The announcement this envelope will produce, without chain position.
    pub fn announcement(&self) -> Announcement {
        Announcement::builder(
            self.stealth_address,
            self.ephemeral_pub_key.as_bytes().to_vec(),
            self.view_tag,
        )
        .metadata(self.metadata.clone())
        .build()
    }

    /// Outbound placeholder to show until the history scan picks the
    /// transaction up.
    pub fn optimistic_message(&self, transaction_hash: TxHash, sender: Option<EthAddress>, now_ms: i64) -> ChatMessage {
        ChatMessage {
            id: self.payload_hash.to_hex(),
            thread_id: self.encrypted_thread_id(),
            content: LOADING_CONTENT.to_string(),
            created_at: now_ms,
            direction: Direction::Outbound,
            transaction_hash,
            sender,
            recipient: Some(self.stealth_address),
            content_available: false,
            payload_hash: Some(self.payload_hash),
            block_number: None,
            log_index: None,
        }
    }
}

/// Prepares a message for `recipient`.
///
/// A blank `thread_label` becomes `"No subject"`.
///
/// # Errors
/// - `InvalidInput` for blank content
/// - `UnsupportedScheme` / `InvalidKey` for a bad meta-address
pub fn prepare_message(recipient: &MetaAddress, content: &str, thread_label: &str) -> Result<OutgoingEnvelope> {
    prepare_message_with_ephemeral(recipient, content, thread_label, None)
}

/// [`prepare_message`] with a caller-supplied ephemeral key, for
/// reproducible tests.
#[instrument(skip(recipient, content, ephemeral))]
pub fn prepare_message_with_ephemeral(
    recipient: &MetaAddress,
    content: &str,
    thread_label: &str,
    ephemeral: Option<KeyPair>,
) -> Result<OutgoingEnvelope> {
    let thread_id = match thread_label.trim() {
        "" => DEFAULT_THREAD_ID,
        label => label,
    };
    let payload = build_message(content.trim(), thread_id)?;

    let stealth = derive_sender_stealth_address(recipient, ephemeral)?;
    let encrypted = encrypt_message(&payload, &stealth.ephemeral.private_key, recipient.view_pub_key())?;

    let frame = encrypted.to_frame();
    let payload_hash = encrypted.payload_hash();
    let metadata = AnnouncementMetadata::v1(Some(&payload_hash)).encode()?;
    let calldata = encode_announce_calldata(
        &stealth.stealth_address,
        stealth.ephemeral.public_key.as_bytes(),
        stealth.view_tag,
        &metadata,
    );
    let blobs = to_blobs(&frame)?;

    debug!(
        stealth_address = %stealth.stealth_address,
        view_tag = stealth.view_tag,
        payload_hash = %payload_hash,
        blobs = blobs.len(),
        "Prepared outgoing message"
    );

    Ok(OutgoingEnvelope {
        stealth_address: stealth.stealth_address,
        ephemeral_pub_key: stealth.ephemeral.public_key,
        view_tag: stealth.view_tag,
        thread_id: payload.thread_id,
        frame,
        payload_hash,
        metadata,
        calldata,
        blobs,
    })
}
