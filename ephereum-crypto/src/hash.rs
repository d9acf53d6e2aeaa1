//! Keccak256 and the ABI identifiers derived from it.
//!
//! Keccak256 is NOT SHA3-256; the padding differs. Ethereum uses Keccak256
//! for addresses, event topics and function selectors.

use sha3::{Digest, Keccak256};

use ephereum_core::types::H256;

/// Computes Keccak256 hash.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Computes Keccak256 over several inputs without concatenating them first.
pub fn keccak256_concat(inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Topic0 of an event, e.g. `MessageEnvelope(address,bytes,bytes1,bytes)`.
pub fn event_topic(signature: &str) -> H256 {
    H256::from_array(keccak256(signature.as_bytes()))
}

/// 4-byte function selector, e.g. for `announce(address,bytes,bytes1,bytes)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
