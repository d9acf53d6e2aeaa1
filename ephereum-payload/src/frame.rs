//! Encrypted frame: `nonce(24) ‖ ciphertext`.
//!
//! The nonce length is fixed, so the ciphertext simply consumes the rest of
//! the frame and no length prefix is needed.

use ephereum_core::constants::NONCE_SIZE;
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::PayloadHash;
use ephereum_crypto::{keccak256, SealedBox};

/// Nonce and ciphertext as carried inside a blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// XChaCha20 nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext including the Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Serializes to the wire frame.
    pub fn to_frame(&self) -> Vec<u8> {
        encode_frame(&self.nonce, &self.ciphertext)
    }

    /// keccak256 of the wire frame.
    pub fn payload_hash(&self) -> PayloadHash {
        payload_hash(&self.to_frame())
    }
}

impl From<SealedBox> for EncryptedPayload {
    fn from(sealed: SealedBox) -> Self {
        Self {
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
        }
    }
}

/// Concatenates `nonce ‖ ciphertext`.
pub fn encode_frame(nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    frame.extend_from_slice(nonce);
    frame.extend_from_slice(ciphertext);
    frame
}

/// Splits a frame back into nonce and ciphertext.
///
/// # Errors
/// `MalformedFrame` if the input is shorter than the nonce.
pub fn decode_frame(bytes: &[u8]) -> Result<EncryptedPayload> {
    if bytes.len() < NONCE_SIZE {
        return Err(EphereumError::MalformedFrame(format!(
            "frame is {} bytes, need at least {}",
            bytes.len(),
            NONCE_SIZE
        )));
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);

    Ok(EncryptedPayload {
        nonce,
        ciphertext: ciphertext.to_vec(),
    })
}

/// Content hash of a full frame; the message identity.
pub fn payload_hash(frame: &[u8]) -> PayloadHash {
    PayloadHash::from_array(keccak256(frame))
}
