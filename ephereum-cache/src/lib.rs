//! TTL cache for Ephereum lookups.
//!
//! Generic in-memory cache with configurable capacity and read-time
//! expiration. Instances are constructed and injected explicitly; nothing
//! here is process-global.

mod cache;

pub use cache::{CacheConfig, CacheStats, TtlCache};
