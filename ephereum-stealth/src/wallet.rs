//! Recipient key material.
//!
//! A recipient holds two independent secp256k1 key pairs:
//! - View keys: detect announcements and decrypt payloads
//! - Spend keys: together with the view key, derive the stealth private key
//!
//! Keys are either generated, imported, or derived deterministically from a
//! wallet signature over [`SIGNATURE_MESSAGE`], so the same wallet always
//! recovers the same identity. Nothing here persists private keys.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use ephereum_core::constants::{SPEND_KEY_CONTEXT, VIEW_KEY_CONTEXT};
use ephereum_core::error::Result;
use ephereum_core::types::{CompressedPoint, KeyPair, MetaAddress, PrivateKey};
use ephereum_crypto::{derive_symmetric_key, generate_keypair, generate_keypair_with_rng, public_key_from_private};

use crate::discovery::{recover_stealth_priv_key, RecoveredStealth};

/// Message a wallet signs to derive its Ephereum keys.
pub const SIGNATURE_MESSAGE: &str = "Ephereum Chat Key Derivation v1\n\nSign this message to derive your stealth address keys.\n\nThis signature is used to deterministically generate your view and spend keys.";

/// A recipient's view and spend key pairs.
///
/// Private keys are zeroized on drop and redacted from `Debug`.
#[derive(Clone)]
pub struct RecipientKeys {
    view: KeyPair,
    spend: KeyPair,
}

impl RecipientKeys {
    /// Generates fresh random keys.
    pub fn generate() -> Self {
        Self {
            view: generate_keypair(),
            spend: generate_keypair(),
        }
    }

    /// Generates keys from the given RNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let view = generate_keypair_with_rng(rng);
        let spend = generate_keypair_with_rng(rng);
        Self { view, spend }
    }

    /// Wraps two existing key pairs. The caller guarantees each public key
    /// matches its private key.
    pub fn from_key_pairs(view: KeyPair, spend: KeyPair) -> Self {
        Self { view, spend }
    }

    /// Imports raw private keys, recomputing the public halves.
    ///
    /// # Errors
    /// `InvalidKey` if either scalar is zero or not below the curve order.
    pub fn from_private_keys(view_priv: PrivateKey, spend_priv: PrivateKey) -> Result<Self> {
        let view_pub = public_key_from_private(&view_priv)?;
        let spend_pub = public_key_from_private(&spend_priv)?;

        Ok(Self {
            view: KeyPair::new(view_priv, view_pub),
            spend: KeyPair::new(spend_priv, spend_pub),
        })
    }

    /// Derives keys from a wallet signature:
    /// `view = HKDF(sig, "ephereum-view-key-v1")`,
    /// `spend = HKDF(sig, "ephereum-spend-key-v1")`.
    ///
    /// # Errors
    /// `InvalidKey` if a derived value is not a valid scalar.
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        let view_okm = derive_symmetric_key(signature, VIEW_KEY_CONTEXT)?;
        let spend_okm = derive_symmetric_key(signature, SPEND_KEY_CONTEXT)?;

        Self::from_private_keys(
            PrivateKey::from_array(*view_okm.as_bytes()),
            PrivateKey::from_array(*spend_okm.as_bytes()),
        )
    }

    /// The view key pair.
    pub fn view(&self) -> &KeyPair {
        &self.view
    }

    /// The spend key pair.
    pub fn spend(&self) -> &KeyPair {
        &self.spend
    }

    /// The publishable meta-address `0x02 ‖ spend_pub ‖ view_pub`.
    pub fn meta_address(&self) -> MetaAddress {
        MetaAddress::new(self.spend.public_key, self.view.public_key)
    }

    /// `viewPub:spendPub` in lower-case hex. Keys per-identity state.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.view.public_key.to_hex(), self.spend.public_key.to_hex())
    }

    /// Recovers the stealth key for an announcement addressed to us.
    pub fn recover(&self, ephem_pub: &CompressedPoint, view_tag: u8) -> Result<RecoveredStealth> {
        recover_stealth_priv_key(&self.view.private_key, &self.spend.private_key, ephem_pub, view_tag)
    }

    /// Exports the keys for local custody.
    pub fn export(&self) -> Result<KeysExport> {
        Ok(KeysExport {
            view_private_key: self.view.private_key.to_hex(),
            spend_private_key: self.spend.private_key.to_hex(),
            meta_address: self.meta_address().to_prefixed()?,
        })
    }

    /// Re-imports exported keys.
    pub fn from_export(export: &KeysExport) -> Result<Self> {
        Self::from_private_keys(
            PrivateKey::from_hex(&export.view_private_key)?,
            PrivateKey::from_hex(&export.spend_private_key)?,
        )
    }
}

impl std::fmt::Debug for RecipientKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientKeys")
            .field("view_public_key", &self.view.public_key)
            .field("spend_public_key", &self.spend.public_key)
            .field("private_keys", &"[REDACTED]")
            .finish()
    }
}

/// Key file contents written by `ephereum keygen`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysExport {
    /// View private key (hex)
    pub view_private_key: String,
    /// Spend private key (hex)
    pub spend_private_key: String,
    /// Meta-address for reference (`st:eth:0x…`)
    pub meta_address: String,
}
