//! Key types for Ephereum.
//!
//! - [`CompressedPoint`]: SEC1 compressed secp256k1 public key (33 bytes)
//! - [`PrivateKey`]: secp256k1 scalar (32 bytes, zeroized on drop)
//! - [`KeyPair`]: Combined public + private key
//!
//! These are byte containers only. Curve membership and scalar range are
//! checked by `ephereum-crypto` when the bytes are first used.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{COMPRESSED_POINT_SIZE, PRIVATE_KEY_SIZE};
use crate::error::{EphereumError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressedPoint {
    bytes: [u8; COMPRESSED_POINT_SIZE],
}

impl CompressedPoint {
    /// Creates a point from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidLength` if the input is not 33 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPRESSED_POINT_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: COMPRESSED_POINT_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; COMPRESSED_POINT_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a point from a fixed-size array.
    pub fn from_array(bytes: [u8; COMPRESSED_POINT_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the point as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; COMPRESSED_POINT_SIZE] {
        &self.bytes
    }

    /// Returns `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses from hex (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for CompressedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompressedPoint({})", self.to_hex())
    }
}

impl std::fmt::Display for CompressedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Serde implementation that uses hex encoding
impl Serialize for CompressedPoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CompressedPoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 private scalar.
///
/// Zeroized when dropped. Never expose this key in logs or error messages.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; PRIVATE_KEY_SIZE],
}

impl PrivateKey {
    /// Creates a private key from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidLength` if the input is not 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: PRIVATE_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; PRIVATE_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a private key from a fixed-size array.
    pub fn from_array(bytes: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.bytes
    }

    /// Returns `0x`-prefixed hex. Only for export to key custody.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses from hex (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 key pair. View and spend roles each use their own pair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Private scalar (auto-zeroized)
    pub private_key: PrivateKey,
    /// Compressed public key (safe to share)
    #[zeroize(skip)]
    pub public_key: CompressedPoint,
}

impl KeyPair {
    /// Creates a new key pair.
    pub fn new(private_key: PrivateKey, public_key: CompressedPoint) -> Self {
        Self {
            private_key,
            public_key,
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_wrong_size() {
        let result = CompressedPoint::from_bytes(&[2u8; 32]);
        assert!(matches!(
            result,
            Err(EphereumError::InvalidLength { expected: 33, actual: 32 })
        ));
    }

    #[test]
    fn test_point_hex_accepts_optional_prefix() {
        let point = CompressedPoint::from_array([0x03; 33]);
        let hex = point.to_hex();
        assert!(hex.starts_with("0x03"));
        assert_eq!(CompressedPoint::from_hex(&hex).unwrap(), point);
        assert_eq!(CompressedPoint::from_hex(&hex[2..]).unwrap(), point);
    }

    #[test]
    fn test_private_key_debug_redacted() {
        let sk = PrivateKey::from_array([0xAB; 32]);
        let debug = format!("{:?}", sk);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));

        let pair = KeyPair::new(sk, CompressedPoint::from_array([0x02; 33]));
        assert!(format!("{:?}", pair).contains("REDACTED"));
    }

    #[test]
    fn test_point_serde() {
        let point = CompressedPoint::from_array([0x02; 33]);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.starts_with("\"0x02"));
        let back: CompressedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(point, back);
    }
}
