//! Address types for Ephereum.
//!
//! - [`MetaAddress`]: The recipient's published identity (scheme + spend + view keys)
//! - [`EthAddress`]: A 20-byte Ethereum address (stealth addresses, senders, contracts)
//! - [`H256`]: A 32-byte hash (transaction hashes, payload hashes, event topics)

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CompressedPoint;
use crate::constants::{
    COMPRESSED_POINT_SIZE, ETH_ADDRESS_SIZE, KECCAK256_SIZE, META_ADDRESS_HEX_LEN,
    META_ADDRESS_PREFIX, META_ADDRESS_SIZE, STEALTH_SCHEME_ID,
};
use crate::error::{EphereumError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A stealth meta-address that recipients publish so senders can reach them.
///
/// # Wire Format
/// ```text
/// scheme (1) || spend_pub_key (33) || view_pub_key (33)   = 67 bytes
/// ```
///
/// Only scheme `0x02` is supported; both encoding and decoding reject
/// anything else.
///
/// # Example
/// ```
/// use ephereum_core::{MetaAddress, CompressedPoint};
///
/// let meta = MetaAddress::new(
///     CompressedPoint::from_array([0x02; 33]),
///     CompressedPoint::from_array([0x03; 33]),
/// );
/// let s = meta.to_prefixed().unwrap();
/// assert!(s.starts_with("st:eth:0x02"));
/// assert_eq!(s.parse::<MetaAddress>().unwrap(), meta);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaAddress {
    scheme: u8,
    spend_pub_key: CompressedPoint,
    view_pub_key: CompressedPoint,
}

impl MetaAddress {
    /// Creates a scheme-2 meta-address.
    pub fn new(spend_pub_key: CompressedPoint, view_pub_key: CompressedPoint) -> Self {
        Self {
            scheme: STEALTH_SCHEME_ID,
            spend_pub_key,
            view_pub_key,
        }
    }

    /// Creates a meta-address with an explicit scheme id.
    ///
    /// Encoding fails later if the scheme is unsupported.
    pub fn from_parts(scheme: u8, spend_pub_key: CompressedPoint, view_pub_key: CompressedPoint) -> Self {
        Self {
            scheme,
            spend_pub_key,
            view_pub_key,
        }
    }

    /// Scheme id.
    pub fn scheme(&self) -> u8 {
        self.scheme
    }

    /// Spend public key.
    pub fn spend_pub_key(&self) -> &CompressedPoint {
        &self.spend_pub_key
    }

    /// View public key.
    pub fn view_pub_key(&self) -> &CompressedPoint {
        &self.view_pub_key
    }

    fn ensure_supported(scheme: u8) -> Result<()> {
        if scheme != STEALTH_SCHEME_ID {
            return Err(EphereumError::UnsupportedScheme(scheme));
        }
        Ok(())
    }

    /// Encodes to the 67-byte wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Self::ensure_supported(self.scheme)?;

        let mut bytes = Vec::with_capacity(META_ADDRESS_SIZE);
        bytes.push(self.scheme);
        bytes.extend_from_slice(self.spend_pub_key.as_bytes());
        bytes.extend_from_slice(self.view_pub_key.as_bytes());
        Ok(bytes)
    }

    /// Decodes from the 67-byte wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ADDRESS_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: META_ADDRESS_SIZE,
                actual: bytes.len(),
            });
        }

        let scheme = bytes[0];
        Self::ensure_supported(scheme)?;

        let spend_end = 1 + COMPRESSED_POINT_SIZE;
        let spend_pub_key = CompressedPoint::from_bytes(&bytes[1..spend_end])?;
        let view_pub_key = CompressedPoint::from_bytes(&bytes[spend_end..])?;

        Ok(Self {
            scheme,
            spend_pub_key,
            view_pub_key,
        })
    }

    /// Encodes as `0x` + 134 hex chars.
    pub fn to_hex(&self) -> Result<String> {
        Ok(format!("0x{}", hex::encode(self.encode()?)))
    }

    /// Encodes as `st:eth:0x...`.
    pub fn to_prefixed(&self) -> Result<String> {
        Ok(format!("{}{}", META_ADDRESS_PREFIX, self.to_hex()?))
    }

    /// Strips surrounding whitespace and an optional `st:eth:` prefix.
    pub fn normalize(s: &str) -> &str {
        let trimmed = s.trim();
        match trimmed.get(..META_ADDRESS_PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(META_ADDRESS_PREFIX) => {
                &trimmed[META_ADDRESS_PREFIX.len()..]
            }
            _ => trimmed,
        }
    }

    /// Structural check: `0x` followed by exactly 134 hex characters.
    ///
    /// Does not check that the keys are on the curve.
    pub fn is_valid(s: &str) -> bool {
        let normalized = Self::normalize(s);
        match normalized.strip_prefix("0x") {
            Some(body) => {
                body.len() == META_ADDRESS_HEX_LEN && body.bytes().all(|b| b.is_ascii_hexdigit())
            }
            None => false,
        }
    }

    /// Parses a prefixed or bare hex meta-address.
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = Self::normalize(s);
        let body = normalized.strip_prefix("0x").ok_or_else(|| {
            EphereumError::InvalidInput("meta-address must start with 0x".into())
        })?;

        if body.len() != META_ADDRESS_HEX_LEN {
            return Err(EphereumError::InvalidLength {
                expected: META_ADDRESS_SIZE,
                actual: body.len() / 2,
            });
        }

        let bytes = hex::decode(body)?;
        Self::decode(&bytes)
    }
}

impl FromStr for MetaAddress {
    type Err = EphereumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for MetaAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaAddress")
            .field("scheme", &self.scheme)
            .field("spend_pub_key", &self.spend_pub_key)
            .field("view_pub_key", &self.view_pub_key)
            .finish()
    }
}

impl std::fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "0x{:02x}{}{}",
            self.scheme,
            hex::encode(self.spend_pub_key.as_bytes()),
            hex::encode(self.view_pub_key.as_bytes())
        )
    }
}

impl Serialize for MetaAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetaAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte Ethereum address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthAddress {
    bytes: [u8; ETH_ADDRESS_SIZE],
}

impl EthAddress {
    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ETH_ADDRESS_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: ETH_ADDRESS_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; ETH_ADDRESS_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from a fixed-size array.
    pub fn from_array(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `0x`-prefixed lowercase hex.
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses from hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Returns true if `s` looks like a 20-byte hex address.
    pub fn is_address(s: &str) -> bool {
        let s = s.trim();
        match s.strip_prefix("0x") {
            Some(body) => body.len() == ETH_ADDRESS_SIZE * 2 && body.bytes().all(|b| b.is_ascii_hexdigit()),
            None => false,
        }
    }

    /// Returns the zero address.
    pub fn zero() -> Self {
        Self {
            bytes: [0u8; ETH_ADDRESS_SIZE],
        }
    }

    /// Returns true if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl FromStr for EthAddress {
    type Err = EphereumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl std::fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EthAddress({})", self.to_hex_string())
    }
}

impl std::fmt::Display for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl Serialize for EthAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 32-BYTE HASH
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte hash value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct H256 {
    bytes: [u8; KECCAK256_SIZE],
}

/// Transaction hash.
pub type TxHash = H256;

/// keccak256 of an encrypted frame; the idempotent message identity.
pub type PayloadHash = H256;

impl H256 {
    /// Creates a hash from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KECCAK256_SIZE {
            return Err(EphereumError::InvalidLength {
                expected: KECCAK256_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; KECCAK256_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from a fixed-size array.
    pub fn from_array(bytes: [u8; KECCAK256_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the hash as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; KECCAK256_SIZE] {
        &self.bytes
    }

    /// Returns `0x`-prefixed lowercase hex.
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

impl FromStr for H256 {
    type Err = EphereumError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl std::fmt::Debug for H256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl std::fmt::Display for H256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for H256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
