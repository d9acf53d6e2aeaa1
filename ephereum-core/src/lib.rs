//! # Ephereum Core
//!
//! Core types, errors, and traits for Ephereum, a stealth-addressed
//! encrypted messaging protocol on secp256k1.
//!
//! This crate provides the foundational building blocks used by all other Ephereum crates:
//!
//! - **Types**: Meta-addresses, keys, announcements, materialized chat messages
//! - **Errors**: A single error enum split into protocol, crypto and transient families
//! - **Constants**: Protocol sizes, HKDF contexts, contract addresses
//! - **Traits**: Narrow interfaces for the log source, blob store and registry
//!
//! ## Example
//!
//! ```rust
//! use ephereum_core::{MetaAddress, CompressedPoint, STEALTH_SCHEME_ID};
//!
//! let meta = MetaAddress::new(
//!     CompressedPoint::from_array([0x02; 33]),
//!     CompressedPoint::from_array([0x03; 33]),
//! );
//! let encoded = meta.encode().unwrap();
//! assert_eq!(encoded[0], STEALTH_SCHEME_ID);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{EphereumError, ErrorKind, Result};
pub use traits::*;
pub use types::*;
