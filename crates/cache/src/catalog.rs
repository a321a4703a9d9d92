//! Typed catalog cache over a [`CacheBackend`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use telemetry::metrics;

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::key::{
    kind_version_key, physical_key, scope_version_key, CacheKey, CacheKind,
    STATS_BRANDS, STATS_CATALOG, STATS_MODELS,
};

/// JSON-encoded cache with TTL by kind and versioned invalidation.
///
/// Never fails: backend errors are logged and reads fall back to a miss.
#[derive(Clone)]
pub struct CatalogCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl CatalogCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let physical = self.resolve(key).await?;
        self.get_physical(&physical).await
    }

    /// Store with the TTL of the key's kind.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        self.put_with_ttl(key, value, self.config.ttl(key.kind)).await;
    }

    pub async fn put_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if let Some(physical) = self.resolve(key).await {
            self.put_physical(&physical, value, ttl).await;
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        let Some(physical) = self.resolve(key).await else {
            return;
        };
        if let Err(e) = self.backend.delete(&physical).await {
            metrics().cache_errors.inc();
            warn!(key = %physical, error = %e, "Cache delete failed");
        }
    }

    /// Orphan every entry of a kind.
    pub async fn invalidate_all(&self, kind: CacheKind) {
        self.bump(&kind_version_key(kind)).await;
    }

    /// Orphan every entry of one scope within a kind.
    pub async fn invalidate_scope(&self, kind: CacheKind, scope: &str) {
        self.bump(&scope_version_key(kind, scope)).await;
    }

    /// A brand was created or changed: drop the entity, every brand list
    /// and brand counts.
    pub async fn invalidate_brand(&self, brand_code: &str) {
        self.invalidate_scope(CacheKind::Brand, brand_code).await;
        self.invalidate_all(CacheKind::BrandList).await;
        self.invalidate_scope(CacheKind::Stats, STATS_BRANDS).await;
        self.invalidate_scope(CacheKind::Stats, STATS_CATALOG).await;
    }

    /// Models of a brand were created or changed.
    pub async fn invalidate_model(&self, model_code: Option<&str>, brand_code: &str) {
        if let Some(code) = model_code {
            self.invalidate_scope(CacheKind::Model, code).await;
        }
        self.invalidate_scope(CacheKind::ModelList, brand_code).await;
        self.invalidate_scope(CacheKind::Stats, STATS_MODELS).await;
        self.invalidate_scope(CacheKind::Stats, STATS_CATALOG).await;
    }

    /// Cache-aside helper: return the cached value or compute and store it.
    ///
    /// The physical key is resolved once, before loading. An invalidation
    /// that lands while the load runs moves readers to a new namespace, so
    /// the loaded value is written where no later read looks.
    pub async fn get_or_load<T, F, Fut>(&self, key: &CacheKey, load: F) -> catalog_core::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = catalog_core::Result<T>>,
    {
        let Some(physical) = self.resolve(key).await else {
            return load().await;
        };
        if let Some(hit) = self.get_physical(&physical).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.put_physical(&physical, &value, self.config.ttl(key.kind)).await;
        Ok(value)
    }

    async fn get_physical<T: DeserializeOwned>(&self, physical: &str) -> Option<T> {
        let raw = match self.backend.get(physical).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                metrics().cache_misses.inc();
                return None;
            }
            Err(e) => {
                metrics().cache_errors.inc();
                warn!(key = %physical, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                metrics().cache_hits.inc();
                Some(value)
            }
            Err(e) => {
                metrics().cache_errors.inc();
                warn!(key = %physical, error = %e, "Dropping undecodable cache entry");
                if let Err(e) = self.backend.delete(physical).await {
                    warn!(key = %physical, error = %e, "Cache delete failed");
                }
                None
            }
        }
    }

    async fn put_physical<T: Serialize>(&self, physical: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                metrics().cache_errors.inc();
                warn!(key = %physical, error = %e, "Cache value not serializable");
                return;
            }
        };

        if let Err(e) = self.backend.set(physical, raw, Some(ttl)).await {
            metrics().cache_errors.inc();
            warn!(key = %physical, error = %e, "Cache write failed");
        }
    }

    /// Build the physical key from the current namespace versions.
    async fn resolve(&self, key: &CacheKey) -> Option<String> {
        let kind_version = self.version(&kind_version_key(key.kind)).await?;
        let scope_version = self.version(&scope_version_key(key.kind, &key.scope)).await?;
        Some(physical_key(key, kind_version, scope_version))
    }

    /// Current version of a namespace. Two readers that both find the
    /// counter missing each bump it, orphaning whatever the first one
    /// stores; that costs a miss, never a stale read.
    async fn version(&self, version_key: &str) -> Option<u64> {
        match self.backend.get(version_key).await {
            Ok(Some(raw)) => {
                if let Ok(v) = raw.parse() {
                    return Some(v);
                }
                warn!(key = version_key, "Corrupt namespace version, reseeding");
            }
            Ok(None) => {}
            Err(e) => {
                metrics().cache_errors.inc();
                warn!(key = version_key, error = %e, "Namespace version read failed");
                return None;
            }
        }

        // Missing or evicted: seed a fresh random epoch.
        self.bump(version_key).await
    }

    async fn bump(&self, version_key: &str) -> Option<u64> {
        match self.backend.incr(version_key).await {
            Ok(v) => {
                debug!(key = version_key, version = v, "Namespace version bumped");
                Some(v)
            }
            Err(e) => {
                metrics().cache_errors.inc();
                warn!(key = version_key, error = %e, "Namespace version bump failed");
                None
            }
        }
    }
}
