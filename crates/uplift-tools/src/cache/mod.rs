//! Tamper-evident cache
//!
//! Values are stored as JSON, never as a native serialization format, and
//! each entry carries an HMAC from the cache signing key.

mod backend;
mod secure;
mod stats;

pub use backend::{CacheBackend, MemoryBackend};
pub use secure::{CacheEntry, DEFAULT_TTL, KEY_PREFIX, SecureCache};
pub use stats::CacheStats;
