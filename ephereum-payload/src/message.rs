//! Message payload and its encryption.
//!
//! ```text
//! shared = ECDH(ephem_priv, view_pub)            // sender
//!        = ECDH(view_priv, ephem_pub)            // recipient
//! key    = HKDF-SHA256(shared, "stealth-chat-v1")
//! frame  = nonce ‖ XChaCha20-Poly1305(key, json(payload))
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use ephereum_core::constants::{CONTENT_TYPE_TEXT, MESSAGE_ENCRYPTION_CONTEXT, PAYLOAD_VERSION};
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{CompressedPoint, PrivateKey};
use ephereum_crypto::{decrypt, derive_symmetric_key, ecdh, encrypt, SymmetricKey};

use crate::frame::{decode_frame, EncryptedPayload};

/// Plaintext message structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Always `"v1"`
    pub version: String,
    /// Conversation subject
    pub thread_id: String,
    /// Message text
    pub content: String,
    /// Always `"text/plain"`
    pub content_type: String,
}

/// Builds a `v1` text payload.
///
/// # Errors
/// `InvalidInput` if either field is blank.
pub fn build_message(content: &str, thread_id: &str) -> Result<MessagePayload> {
    if content.trim().is_empty() {
        return Err(EphereumError::InvalidInput("message content is required".into()));
    }
    if thread_id.trim().is_empty() {
        return Err(EphereumError::InvalidInput("thread id is required".into()));
    }

    Ok(MessagePayload {
        version: PAYLOAD_VERSION.to_string(),
        thread_id: thread_id.to_string(),
        content: content.to_string(),
        content_type: CONTENT_TYPE_TEXT.to_string(),
    })
}

fn message_key(private_key: &PrivateKey, public_key: &CompressedPoint) -> Result<SymmetricKey> {
    let shared = ecdh(private_key, public_key)?;
    derive_symmetric_key(shared.as_bytes(), MESSAGE_ENCRYPTION_CONTEXT)
}

/// Encrypts `payload` to the recipient's view key.
pub fn encrypt_message(
    payload: &MessagePayload,
    ephem_priv: &PrivateKey,
    view_pub: &CompressedPoint,
) -> Result<EncryptedPayload> {
    let key = message_key(ephem_priv, view_pub)?;
    let plaintext = serde_json::to_vec(payload)?;
    Ok(encrypt(&key, &plaintext, None)?.into())
}

/// Decrypts a wire frame with the recipient's view key.
///
/// # Errors
/// - `MalformedFrame` for a short frame, invalid JSON or an unknown version
/// - `AuthenticationFailure` for a wrong key or tampered ciphertext
/// - `InvalidKey` if `ephem_pub` is not on the curve
pub fn decrypt_message(frame: &[u8], view_priv: &PrivateKey, ephem_pub: &CompressedPoint) -> Result<MessagePayload> {
    let encrypted = decode_frame(frame)?;
    decrypt_payload(&encrypted, view_priv, ephem_pub)
}

/// Like [`decrypt_message`] for an already split frame.
pub fn decrypt_payload(
    encrypted: &EncryptedPayload,
    view_priv: &PrivateKey,
    ephem_pub: &CompressedPoint,
) -> Result<MessagePayload> {
    let key = message_key(view_priv, ephem_pub)?;
    let plaintext = decrypt(&key, &encrypted.ciphertext, &encrypted.nonce, None)?;

    let payload: MessagePayload = serde_json::from_slice(&plaintext)
        .map_err(|e| EphereumError::MalformedFrame(format!("payload is not a message: {}", e)))?;
    if payload.version != PAYLOAD_VERSION {
        debug!(version = %payload.version, "Unknown payload version");
        return Err(EphereumError::MalformedFrame(format!(
            "unsupported payload version: {}",
            payload.version
        )));
    }

    Ok(payload)
}
