//! HKDF-SHA256 key derivation.
//!
//! All symmetric keys in the protocol come from one construction: HKDF with
//! a 32-byte zero salt and the purpose string as `info`. Distinct purposes
//! therefore yield independent keys from the same input material.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use ephereum_core::constants::SYMMETRIC_KEY_SIZE;
use ephereum_core::error::{EphereumError, Result};

/// A 32-byte symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Wraps raw key bytes.
    pub fn from_array(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// Derives a 32-byte key: `HKDF-SHA256(ikm, salt = 0^32, info = context)`.
///
/// `ikm` may be an ECDH shared secret or a wallet signature.
pub fn derive_symmetric_key(ikm: impl AsRef<[u8]>, context: &str) -> Result<SymmetricKey> {
    let salt = [0u8; 32];
    let hk = Hkdf::<Sha256>::new(Some(&salt), ikm.as_ref());

    let mut okm = [0u8; SYMMETRIC_KEY_SIZE];
    hk.expand(context.as_bytes(), &mut okm)
        .map_err(|_| EphereumError::KeyDerivationError("HKDF output length rejected".into()))?;

    Ok(SymmetricKey { bytes: okm })
}
