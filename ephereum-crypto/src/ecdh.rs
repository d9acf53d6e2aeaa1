//! secp256k1 keys and Diffie-Hellman.
//!
//! The shared secret is the x-coordinate of `priv · Pub`, i.e. the last 32
//! bytes of the compressed shared point. The parity byte is discarded.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use ephereum_core::constants::{PRIVATE_KEY_SIZE, SHARED_SECRET_SIZE};
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{CompressedPoint, KeyPair, PrivateKey};

/// ECDH shared x-coordinate. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Wraps raw bytes, e.g. for test vectors.
    pub fn from_array(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.bytes
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates a key pair from the OS random source.
pub fn generate_keypair() -> KeyPair {
    generate_keypair_with_rng(&mut OsRng)
}

/// Generates a key pair from the given RNG (seeded RNGs make tests reproducible).
pub fn generate_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> KeyPair {
    let secret = SecretKey::random(rng);
    let public = compress(&secret.public_key());

    let mut bytes = [0u8; PRIVATE_KEY_SIZE];
    bytes.copy_from_slice(secret.to_bytes().as_slice());
    KeyPair::new(PrivateKey::from_array(bytes), public)
}

/// Computes the compressed public key of a private scalar.
pub fn public_key_from_private(private_key: &PrivateKey) -> Result<CompressedPoint> {
    let secret = parse_secret_key(private_key)?;
    Ok(compress(&secret.public_key()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIFFIE-HELLMAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes the ECDH shared x-coordinate.
///
/// # Errors
/// `InvalidKey` if the scalar is zero/out of range or the point is not on the curve.
pub fn ecdh(private_key: &PrivateKey, public_key: &CompressedPoint) -> Result<SharedSecret> {
    let secret = parse_secret_key(private_key)?;
    let public = parse_public_key(public_key)?;

    let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());

    let mut bytes = [0u8; SHARED_SECRET_SIZE];
    bytes.copy_from_slice(shared.raw_secret_bytes().as_slice());
    Ok(SharedSecret { bytes })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn parse_secret_key(private_key: &PrivateKey) -> Result<SecretKey> {
    SecretKey::from_slice(private_key.as_bytes())
        .map_err(|_| EphereumError::InvalidKey("private key is not a valid secp256k1 scalar".into()))
}

pub(crate) fn parse_public_key(point: &CompressedPoint) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(point.as_bytes())
        .map_err(|_| EphereumError::InvalidKey("public key is not a valid secp256k1 point".into()))
}

pub(crate) fn compress(public: &PublicKey) -> CompressedPoint {
    let encoded = public.to_encoded_point(true);
    let mut bytes = [0u8; 33];
    bytes.copy_from_slice(encoded.as_bytes());
    CompressedPoint::from_array(bytes)
}
