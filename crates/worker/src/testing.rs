use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use catalog_cache::{CacheConfig, CatalogCache, MokaBackend};
use catalog_core::{
    Brand, BrandRef, Error, Model, ModelRef, ModelUpdate, NewBrand, NewModel, PageRequest, Result,
    VehicleType,
};
use catalog_store::{CatalogStore, MemoryStore};
use fipe_client::UpstreamClient;

use crate::processor::{IngestionProcessor, ProcessorConfig};

struct Script {
    models: Vec<ModelRef>,
    failures_left: AtomicU32,
    panics_left: AtomicU32,
    calls: AtomicU32,
}

/// Upstream returning the same models for every brand, after failing the
/// first `n` model fetches.
#[derive(Clone)]
pub struct ScriptedUpstream {
    script: Arc<Script>,
}

impl ScriptedUpstream {
    pub fn new(models: &[(&str, &str)]) -> Self {
        Self {
            script: Arc::new(Script {
                models: models
                    .iter()
                    .map(|(codigo, nome)| ModelRef {
                        codigo: codigo.to_string(),
                        nome: nome.to_string(),
                    })
                    .collect(),
                failures_left: AtomicU32::new(0),
                panics_left: AtomicU32::new(0),
                calls: AtomicU32::new(0),
            }),
        }
    }

    pub fn failing(self, n: u32) -> Self {
        self.script.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Panic inside the first `n` model fetches.
    pub fn panicking(self, n: u32) -> Self {
        self.script.panics_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> u32 {
        self.script.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn list_brands(&self, _vehicle_type: VehicleType) -> Result<Vec<BrandRef>> {
        Ok(Vec::new())
    }

    async fn list_models(&self, _vehicle_type: VehicleType, brand_code: &str) -> Result<Vec<ModelRef>> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        let panicking = self
            .script
            .panics_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panicking {
            panic!("models of {}: scripted panic", brand_code);
        }
        let failing = self
            .script
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::upstream(format!("models of {}: HTTP 503", brand_code)));
        }
        Ok(self.script.models.clone())
    }
}

pub fn fast_config() -> ProcessorConfig {
    ProcessorConfig {
        max_retries: 3,
        retry_delay_ms: 5,
        delay_between_requests_ms: 0,
    }
}

pub fn cache() -> CatalogCache {
    CatalogCache::new(Arc::new(MokaBackend::new(10_000)), CacheConfig::default())
}

pub fn processor(
    store: Arc<dyn CatalogStore>,
    upstream: ScriptedUpstream,
    config: ProcessorConfig,
) -> IngestionProcessor {
    IngestionProcessor::new(store, Arc::new(upstream), cache(), config)
}

/// Store that replays the races and failures a shared database produces.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Brand codes whose next lookup misses, as if another worker had
    /// not committed yet.
    unseen_brands: Mutex<HashSet<String>>,
    /// Model codes that look absent to `model_exists`.
    unseen_models: Mutex<HashSet<String>>,
    /// Model codes whose insert fails.
    broken_models: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn hide_brand_once(&self, code: &str) {
        self.unseen_brands.lock().insert(code.to_string());
    }

    pub fn hide_model(&self, code: &str) {
        self.unseen_models.lock().insert(code.to_string());
    }

    pub fn break_model(&self, code: &str) {
        self.broken_models.lock().insert(code.to_string());
    }
}

#[async_trait]
impl CatalogStore for FlakyStore {
    async fn find_brand(&self, code: &str) -> Result<Option<Brand>> {
        if self.unseen_brands.lock().remove(code) {
            return Ok(None);
        }
        self.inner.find_brand(code).await
    }

    async fn insert_brand(&self, brand: &NewBrand) -> Result<Brand> {
        self.inner.insert_brand(brand).await
    }

    async fn list_brands(
        &self,
        vehicle_type: Option<VehicleType>,
        page: PageRequest,
    ) -> Result<Vec<Brand>> {
        self.inner.list_brands(vehicle_type, page).await
    }

    async fn count_brands(&self, vehicle_type: Option<VehicleType>) -> Result<u64> {
        self.inner.count_brands(vehicle_type).await
    }

    async fn find_model(&self, code: &str) -> Result<Option<Model>> {
        if self.unseen_models.lock().contains(code) {
            return Ok(None);
        }
        self.inner.find_model(code).await
    }

    async fn insert_model(&self, model: &NewModel) -> Result<Model> {
        if self.broken_models.lock().contains(&model.codigo_fipe) {
            return Err(Error::database(format!(
                "insert of model {} failed",
                model.codigo_fipe
            )));
        }
        self.inner.insert_model(model).await
    }

    async fn list_models(&self, brand_id: i64, page: PageRequest) -> Result<Vec<Model>> {
        self.inner.list_models(brand_id, page).await
    }

    async fn count_models(&self, brand_id: Option<i64>) -> Result<u64> {
        self.inner.count_models(brand_id).await
    }

    async fn update_model(&self, code: &str, update: &ModelUpdate) -> Result<Option<Model>> {
        self.inner.update_model(code, update).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
