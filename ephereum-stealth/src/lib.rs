//! # Ephereum Stealth Address Protocol
//!
//! Sender-side derivation and recipient-side recovery of one-time
//! secp256k1 stealth addresses (ERC-5564 scheme `0x02`).
//!
//! This crate provides:
//!
//! - **Recipient keys**: view + spend key pairs, generated, imported, or
//!   derived from a wallet signature
//! - **Meta-address creation**: The publishable `st:eth:0x02…` identity
//! - **Sender derivation**: Ephemeral key, view tag and stealth address
//! - **Recovery**: View-tag filter and stealth private key recovery
//!
//! ## Quick Start
//!
//! ```rust
//! use ephereum_stealth::{derive_sender_stealth_address, recover_stealth_priv_key, RecipientKeys};
//!
//! // Recipient: generate keys and publish the meta-address
//! let keys = RecipientKeys::generate();
//! let meta = keys.meta_address();
//!
//! // Sender: derive a one-time address
//! let sent = derive_sender_stealth_address(&meta, None).unwrap();
//!
//! // Recipient: recover the key that controls it
//! let found = recover_stealth_priv_key(
//!     &keys.view().private_key,
//!     &keys.spend().private_key,
//!     &sent.ephemeral.public_key,
//!     sent.view_tag,
//! )
//! .unwrap();
//! assert_eq!(found.stealth_address, sent.stealth_address);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod payment;
pub mod wallet;

pub use discovery::{check_announcement, recover_stealth_priv_key, RecoveredStealth, ScanResult, ScanStats};
pub use payment::{derive_sender_stealth_address, SenderStealth};
pub use wallet::{KeysExport, RecipientKeys, SIGNATURE_MESSAGE};
