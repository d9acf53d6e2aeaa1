//! # Ephereum Cryptography
//!
//! secp256k1 and symmetric primitives for the Ephereum protocol.
//!
//! This crate provides:
//!
//! - **Keys**: secp256k1 key generation, validation and ECDH
//! - **KDF**: HKDF-SHA256 with a zero salt and per-purpose context strings
//! - **AEAD**: XChaCha20-Poly1305 with a fresh random nonce per call
//! - **Hash**: keccak256, event topics and function selectors
//! - **View Tags**: One-byte scan filter
//! - **Derivation**: Stealth tweak, stealth public/private keys and addresses
//!
//! ## Security Properties
//!
//! - Scalar multiplication is constant-time (`k256`)
//! - View tag comparison is constant-time (`subtle`)
//! - Private keys and derived symmetric keys are zeroized on drop
//! - Callers can never supply a nonce
//!
//! ## Example
//!
//! ```rust
//! use ephereum_crypto::{generate_keypair, ecdh, derive_symmetric_key, encrypt, decrypt};
//!
//! let alice = generate_keypair();
//! let bob = generate_keypair();
//!
//! let shared = ecdh(&alice.private_key, &bob.public_key).unwrap();
//! let key = derive_symmetric_key(&shared, "example-v1").unwrap();
//!
//! let sealed = encrypt(&key, b"hi", None).unwrap();
//! let opened = decrypt(&key, &sealed.ciphertext, &sealed.nonce, None).unwrap();
//! assert_eq!(opened, b"hi");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod aead;
pub mod derive;
pub mod ecdh;
pub mod hash;
pub mod kdf;
pub mod view_tag;

// Re-export main functions at crate root
pub use aead::{decrypt, encrypt, SealedBox};
pub use derive::{
    compute_tweak, derive_eth_address, derive_stealth_address, derive_stealth_keys,
    derive_stealth_private_key, derive_stealth_public_key, eth_address_of_private_key,
    verify_stealth_address, StealthKeys,
};
pub use ecdh::{ecdh, generate_keypair, generate_keypair_with_rng, public_key_from_private, SharedSecret};
pub use hash::{event_topic, function_selector, keccak256, keccak256_concat};
pub use kdf::{derive_symmetric_key, SymmetricKey};
pub use view_tag::{compute_view_tag, verify_view_tag};
