//! # Ephereum Registry
//!
//! Everything between the protocol core and the chain.
//!
//! - **abi**: `MessageEnvelope` event and `announce` call codec
//! - **memory**: in-memory [`LogSource`] for development and tests
//! - **blobs**: in-memory and directory-backed [`BlobStore`]s
//! - **rpc**: JSON-RPC [`LogSource`] and [`MetaAddressRegistry`]
//! - **cached**: TTL-cached wrappers around either
//! - **erc6538**: recipient resolution through the ERC-6538 registry
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ephereum_registry::{CachedLogSource, JsonRpcLogSource};
//!
//! let rpc = Arc::new(JsonRpcLogSource::new("https://ethereum.publicnode.com")?);
//! let logs = CachedLogSource::new(rpc);
//! ```
//!
//! [`LogSource`]: ephereum_core::traits::LogSource
//! [`BlobStore`]: ephereum_core::traits::BlobStore
//! [`MetaAddressRegistry`]: ephereum_core::traits::MetaAddressRegistry

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod abi;
mod blobs;
mod cached;
mod erc6538;
mod memory;
mod rpc;

pub use abi::{decode_envelope_log, encode_announce_calldata, message_envelope_topic, RawLog};
pub use blobs::{DirBlobStore, MemoryBlobStore};
pub use cached::{log_cache_key, CachedLogSource, CachedMetaAddressRegistry};
pub use erc6538::resolve_recipient;
pub use memory::{LogQuery, MemoryRegistry};
pub use rpc::{parse_quantity, JsonRpcLogSource, RpcConfig, DEFAULT_ETH_RPC_URL};
