//! Stealth key and address derivation.
//!
//! ## Derivation Flow
//!
//! ```text
//! shared = ECDH(ephemeral, view).x
//!       ↓
//! view_tag = keccak256(shared)[0]
//! tweak    = keccak256(shared || view_tag) mod n
//!       ↓
//! stealth_pub = spend_pub + tweak·G
//!       ↓
//! eth_address = keccak256(uncompressed(stealth_pub)[1..])[12..32]
//! ```
//!
//! ## Private Key Derivation
//!
//! The recipient, holding the spend scalar, derives the matching key:
//!
//! ```text
//! stealth_priv = (spend_priv + tweak) mod n
//! ```

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey, Scalar, SecretKey, U256};
use subtle::ConstantTimeEq;

use ephereum_core::constants::{ETH_ADDRESS_SIZE, KECCAK256_SIZE};
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{CompressedPoint, EthAddress, PrivateKey};

use crate::ecdh::{compress, parse_public_key, parse_secret_key};
use crate::hash::keccak256_concat;

/// Result of full stealth derivation on the recipient side.
#[derive(Debug)]
pub struct StealthKeys {
    /// The stealth public key
    pub public_key: CompressedPoint,
    /// The stealth private key (zeroized on drop)
    pub private_key: PrivateKey,
    /// The derived Ethereum address
    pub address: EthAddress,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TWEAK
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes the tweak scalar `keccak256(shared || view_tag) mod n`.
pub fn compute_tweak(shared_secret: &[u8], view_tag: u8) -> Scalar {
    let hash = keccak256_concat(&[shared_secret, &[view_tag]]);
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(hash))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PUBLIC KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives `spend_pub + tweak·G`.
///
/// # Errors
/// `InvalidKey` if `spend_pub` is not a curve point or the sum is the
/// point at infinity.
pub fn derive_stealth_public_key(
    spend_pub: &CompressedPoint,
    shared_secret: &[u8],
    view_tag: u8,
) -> Result<CompressedPoint> {
    let spend = parse_public_key(spend_pub)?;
    let tweak = compute_tweak(shared_secret, view_tag);

    let point = spend.to_projective() + ProjectivePoint::GENERATOR * tweak;
    let stealth = PublicKey::from_affine(point.to_affine())
        .map_err(|_| EphereumError::InvalidKey("stealth point is the identity".into()))?;

    Ok(compress(&stealth))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PRIVATE KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives `(spend_priv + tweak) mod n`.
///
/// # Security
///
/// The returned key is zeroized on drop.
pub fn derive_stealth_private_key(
    spend_priv: &PrivateKey,
    shared_secret: &[u8],
    view_tag: u8,
) -> Result<PrivateKey> {
    let spend = parse_secret_key(spend_priv)?;
    let tweak = compute_tweak(shared_secret, view_tag);

    let spend_scalar: Scalar = *spend.to_nonzero_scalar();
    let sum = spend_scalar + tweak;

    let non_zero = Option::<NonZeroScalar>::from(NonZeroScalar::new(sum))
        .ok_or_else(|| EphereumError::InvalidKey("stealth private key is zero".into()))?;
    let secret = SecretKey::from(non_zero);

    PrivateKey::from_bytes(secret.to_bytes().as_slice())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the Ethereum address of a public key: the last 20 bytes of
/// keccak256 over the 64-byte uncompressed encoding (without the 0x04 prefix).
pub fn derive_eth_address(public_key: &CompressedPoint) -> Result<EthAddress> {
    let public = parse_public_key(public_key)?;
    Ok(address_of(&public))
}

/// Derives the Ethereum address controlled by a private key.
pub fn eth_address_of_private_key(private_key: &PrivateKey) -> Result<EthAddress> {
    let secret = parse_secret_key(private_key)?;
    Ok(address_of(&secret.public_key()))
}

fn address_of(public: &PublicKey) -> EthAddress {
    let uncompressed = public.to_encoded_point(false);
    let hash = keccak256_concat(&[&uncompressed.as_bytes()[1..]]);

    let mut address_bytes = [0u8; ETH_ADDRESS_SIZE];
    address_bytes.copy_from_slice(&hash[KECCAK256_SIZE - ETH_ADDRESS_SIZE..]);
    EthAddress::from_array(address_bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMBINED DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives stealth public key, private key and address in one go.
pub fn derive_stealth_keys(
    spend_pub: &CompressedPoint,
    spend_priv: &PrivateKey,
    shared_secret: &[u8],
    view_tag: u8,
) -> Result<StealthKeys> {
    let public_key = derive_stealth_public_key(spend_pub, shared_secret, view_tag)?;
    let private_key = derive_stealth_private_key(spend_priv, shared_secret, view_tag)?;
    let address = derive_eth_address(&public_key)?;

    Ok(StealthKeys {
        public_key,
        private_key,
        address,
    })
}

/// Derives only the address (what a sender needs).
pub fn derive_stealth_address(
    spend_pub: &CompressedPoint,
    shared_secret: &[u8],
    view_tag: u8,
) -> Result<EthAddress> {
    let stealth_pub = derive_stealth_public_key(spend_pub, shared_secret, view_tag)?;
    derive_eth_address(&stealth_pub)
}

/// Checks that `expected` is the stealth address for this shared secret.
pub fn verify_stealth_address(
    spend_pub: &CompressedPoint,
    shared_secret: &[u8],
    view_tag: u8,
    expected: &EthAddress,
) -> Result<bool> {
    let derived = derive_stealth_address(spend_pub, shared_secret, view_tag)?;
    Ok(derived.as_bytes().ct_eq(expected.as_bytes()).into())
}
