//! Cache layers that avoid redundant network calls and recomputation
//!
//! - [`WebCache`]: persisted URL → response store with a time-to-live
//! - [`ComputeCache`]: bounded in-memory LRU store for parse and match results

mod compute_cache;
mod web_cache;

pub use compute_cache::{ComputeCache, Weigh};
pub use web_cache::{CachedResponse, WebCache};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised by the persistent web cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Web cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Web cache IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Hex SHA-256 over the given parts
///
/// Parts are separated by a unit separator so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
pub fn hash_key<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}
