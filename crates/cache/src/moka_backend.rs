//! In-process backend on moka with per-entry TTL.

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use catalog_core::Result;

use crate::backend::{random_epoch, CacheBackend};

#[derive(Debug, Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Option<Duration>,
}

/// Expires each entry after its own TTL; re-setting a key restarts it.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

pub struct MokaBackend {
    cache: Cache<String, Entry>,
    // Serializes read-modify-write in incr.
    incr_lock: Mutex<()>,
}

impl MokaBackend {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            incr_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl CacheBackend for MokaBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|e| e.value.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.into(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let _guard = self.incr_lock.lock().await;

        let current = self
            .cache
            .get(key)
            .await
            .and_then(|e| e.value.parse::<u64>().ok())
            .unwrap_or_else(random_epoch);
        let next = current.wrapping_add(1);

        self.set(key, next.to_string(), None).await?;
        Ok(next)
    }
}
