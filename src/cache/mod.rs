//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! GET request
//!     → cache_key(url) = "cache:" + url
//!     → CacheStore::get → hit: respond from cache
//!                       → miss: forward, then CacheStore::set(key, body, 30s)
//! ```
//!
//! # Design Decisions
//! - The store is an external service reached through a narrow trait
//! - Each worker owns its own connection
//! - Read errors are treated as misses; write errors are logged
//! - Expiry is the store's job (TTL), last write wins per key

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{CacheBackend, CacheConfig};

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

/// Lifetime of a cached upstream body.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Key under which the body for `url` is cached.
pub fn cache_key(url: &str) -> String {
    format!("cache:{url}")
}

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Fetch a live value. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Connect the configured cache store.
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    match config.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisCache::connect(&config.url).await?)),
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
    }
}
