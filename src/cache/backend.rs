//! Cache backend capability.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a cache backend.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The store could not be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The TTL cannot be represented as an expiry instant.
    #[error("ttl of {ttl_secs}s is out of range")]
    InvalidTtl { ttl_secs: u64 },

    /// The key pattern is not a valid glob.
    #[error("invalid key pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// The narrow set of operations the cache service needs from a store.
///
/// Values are opaque serialized strings. Patterns use glob syntax
/// (`*`, `?`, `[...]`).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Delete `keys`, returning how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}
