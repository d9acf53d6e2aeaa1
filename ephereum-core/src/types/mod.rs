//! Domain types for Ephereum.
//!
//! - [`KeyPair`]: secp256k1 private scalar + compressed public key
//! - [`MetaAddress`]: Published recipient identity (scheme + spend + view keys)
//! - [`EthAddress`] / [`H256`]: Ethereum addresses and 32-byte hashes
//! - [`Announcement`]: A decoded `MessageEnvelope` log
//! - [`ChatMessage`] / [`PendingAnnouncement`] / [`SyncWatermark`]: Materialized mailbox state

mod keys;
mod address;
mod announcement;
mod message;

pub use keys::*;
pub use address::*;
pub use announcement::*;
pub use message::*;
