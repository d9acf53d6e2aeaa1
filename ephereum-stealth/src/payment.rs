//! Stealth address creation (sender side).

use ephereum_core::constants::STEALTH_SCHEME_ID;
use ephereum_core::error::{EphereumError, Result};
use ephereum_core::types::{Announcement, CompressedPoint, EthAddress, KeyPair, MetaAddress};
use ephereum_crypto::derive::{derive_eth_address, derive_stealth_public_key};
use ephereum_crypto::{compute_view_tag, ecdh, generate_keypair};

/// Everything a sender needs to address one message.
///
/// `ephemeral.private_key` is only needed to encrypt the payload to the
/// recipient's view key and is dropped (and zeroized) after sending. It is
/// not the stealth private key.
#[derive(Clone, Debug)]
pub struct SenderStealth {
    /// The one-time address to announce
    pub stealth_address: EthAddress,
    /// `spend_pub + tweak·G`
    pub stealth_pub_key: CompressedPoint,
    /// One-byte scan filter
    pub view_tag: u8,
    /// Ephemeral key pair; the public half is published
    pub ephemeral: KeyPair,
}

impl SenderStealth {
    /// Builds the announcement this derivation corresponds to.
    pub fn announcement(&self, metadata: Vec<u8>) -> Announcement {
        Announcement::builder(
            self.stealth_address,
            self.ephemeral.public_key.as_bytes().to_vec(),
            self.view_tag,
        )
        .metadata(metadata)
        .build()
    }
}

/// Derives a fresh stealth address for `meta_address`.
///
/// A random ephemeral key pair is generated unless one is supplied;
/// supplying one is only meant for reproducible tests.
///
/// # Errors
/// - `UnsupportedScheme` if the meta-address is not scheme `0x02`
/// - `InvalidKey` if either public key is not on the curve
pub fn derive_sender_stealth_address(
    meta_address: &MetaAddress,
    ephemeral: Option<KeyPair>,
) -> Result<SenderStealth> {
    if meta_address.scheme() != STEALTH_SCHEME_ID {
        return Err(EphereumError::UnsupportedScheme(meta_address.scheme()));
    }

    let ephemeral = ephemeral.unwrap_or_else(generate_keypair);

    let shared = ecdh(&ephemeral.private_key, meta_address.view_pub_key())?;
    let view_tag = compute_view_tag(shared.as_bytes());

    let stealth_pub_key = derive_stealth_public_key(meta_address.spend_pub_key(), shared.as_bytes(), view_tag)?;
    let stealth_address = derive_eth_address(&stealth_pub_key)?;

    Ok(SenderStealth {
        stealth_address,
        stealth_pub_key,
        view_tag,
        ephemeral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephereum_crypto::generate_keypair_with_rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_meta_address() -> MetaAddress {
        let spend = generate_keypair();
        let view = generate_keypair();
        MetaAddress::new(spend.public_key, view.public_key)
    }

    #[test]
    fn test_derive_sender_stealth_address() {
        let meta = test_meta_address();
        let sent = derive_sender_stealth_address(&meta, None).unwrap();

        assert!(!sent.stealth_address.is_zero());
        assert_ne!(&sent.stealth_pub_key, meta.spend_pub_key());
    }

    #[test]
    fn test_fresh_ephemeral_each_call() {
        let meta = test_meta_address();

        let a = derive_sender_stealth_address(&meta, None).unwrap();
        let b = derive_sender_stealth_address(&meta, None).unwrap();

        assert_ne!(a.stealth_address, b.stealth_address);
        assert_ne!(a.ephemeral.public_key, b.ephemeral.public_key);
    }

    #[test]
    fn test_supplied_ephemeral_is_deterministic() {
        let meta = test_meta_address();
        let eph = generate_keypair_with_rng(&mut ChaCha20Rng::seed_from_u64(11));

        let a = derive_sender_stealth_address(&meta, Some(eph.clone())).unwrap();
        let b = derive_sender_stealth_address(&meta, Some(eph)).unwrap();

        assert_eq!(a.stealth_address, b.stealth_address);
        assert_eq!(a.view_tag, b.view_tag);
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let spend = generate_keypair();
        let view = generate_keypair();
        let meta = MetaAddress::from_parts(0x01, spend.public_key, view.public_key);

        assert!(matches!(
            derive_sender_stealth_address(&meta, None),
            Err(EphereumError::UnsupportedScheme(0x01))
        ));
    }

    #[test]
    fn test_invalid_view_key_rejected() {
        let spend = generate_keypair();
        let meta = MetaAddress::new(spend.public_key, CompressedPoint::from_array([0x09; 33]));
        assert!(matches!(
            derive_sender_stealth_address(&meta, None),
            Err(EphereumError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_announcement_carries_derivation() {
        let meta = test_meta_address();
        let sent = derive_sender_stealth_address(&meta, None).unwrap();
        let ann = sent.announcement(b"{\"version\":\"v1\"}".to_vec());

        assert_eq!(ann.recipient_stealth_address, sent.stealth_address);
        assert_eq!(ann.ephemeral_pub_key, sent.ephemeral.public_key.as_bytes());
        assert_eq!(ann.view_tag, sent.view_tag);
        assert!(ann.validate().is_ok());
    }
}
