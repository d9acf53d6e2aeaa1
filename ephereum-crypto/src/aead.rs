//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Every call to [`encrypt`] draws a fresh 24-byte nonce from the OS RNG.
//! Callers never supply a nonce, so reuse under one key is not possible
//! through this API.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;

use ephereum_core::constants::NONCE_SIZE;
use ephereum_core::error::{EphereumError, Result};

use crate::kdf::SymmetricKey;

/// Output of [`encrypt`]: the nonce and `ciphertext || tag`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBox {
    /// Random 24-byte nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the 16-byte Poly1305 tag appended
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext`, optionally binding `aad`.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8], aad: Option<&[u8]>) -> Result<SealedBox> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let payload = Payload {
        msg: plaintext,
        aad: aad.unwrap_or_default(),
    };
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), payload)
        .map_err(|_| EphereumError::InternalError("encryption failed".into()))?;

    Ok(SealedBox { nonce, ciphertext })
}

/// Decrypts and authenticates `ciphertext`.
///
/// # Errors
/// - `InvalidLength` if `nonce` is not 24 bytes
/// - `AuthenticationFailure` on a wrong key, a wrong AAD or any tampering
pub fn decrypt(
    key: &SymmetricKey,
    ciphertext: &[u8],
    nonce: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(EphereumError::InvalidLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let payload = Payload {
        msg: ciphertext,
        aad: aad.unwrap_or_default(),
    };

    cipher
        .decrypt(XNonce::from_slice(nonce), payload)
        .map_err(|_| EphereumError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephereum_core::constants::AEAD_TAG_SIZE;

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_array([byte; 32])
    }

    #[test]
    fn test_encrypt_decrypt() {
        let k = key(1);
        let sealed = encrypt(&k, b"hello", None).unwrap();
        assert_eq!(sealed.ciphertext.len(), 5 + AEAD_TAG_SIZE);
        assert_eq!(decrypt(&k, &sealed.ciphertext, &sealed.nonce, None).unwrap(), b"hello");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let k = key(2);
        let a = encrypt(&k, b"same", None).unwrap();
        let b = encrypt(&k, b"same", None).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt(&key(3), b"secret", None).unwrap();
        let err = decrypt(&key(4), &sealed.ciphertext, &sealed.nonce, None).unwrap_err();
        assert!(matches!(err, EphereumError::AuthenticationFailure));
    }

    #[test]
    fn test_aad_is_bound() {
        let k = key(5);
        let sealed = encrypt(&k, b"payload", Some(b"header")).unwrap();
        assert!(decrypt(&k, &sealed.ciphertext, &sealed.nonce, Some(b"header")).is_ok());
        assert!(decrypt(&k, &sealed.ciphertext, &sealed.nonce, Some(b"other")).is_err());
        assert!(decrypt(&k, &sealed.ciphertext, &sealed.nonce, None).is_err());
    }

    #[test]
    fn test_tampering_detected() {
        let k = key(6);
        let mut sealed = encrypt(&k, b"payload", None).unwrap();
        sealed.ciphertext[0] ^= 0x01;
        assert!(decrypt(&k, &sealed.ciphertext, &sealed.nonce, None).is_err());
    }

    #[test]
    fn test_bad_nonce_length() {
        let err = decrypt(&key(7), &[0u8; 32], &[0u8; 12], None).unwrap_err();
        assert!(matches!(err, EphereumError::InvalidLength { expected: 24, actual: 12 }));
    }
}
