//! Key/value store behind the catalog cache.

use async_trait::async_trait;
use std::time::Duration;

use catalog_core::Result;

/// Minimal key/value contract: per-key TTL and atomic increment.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value`; `None` means no expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increment a counter and return the new value. A missing
    /// counter is first seeded with a random epoch.
    async fn incr(&self, key: &str) -> Result<u64>;
}

/// Random starting point for a counter that is missing or was evicted.
pub fn random_epoch() -> u64 {
    // Keep headroom so increments never overflow.
    (uuid::Uuid::new_v4().as_u128() as u64) >> 16
}
