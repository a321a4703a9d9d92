use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

use catalog_cache::{CacheConfig, CatalogCache, MokaBackend};
use catalog_core::{
    Brand, BrandRef, Error, Model, ModelRef, ModelUpdate, NewBrand, NewModel, PageRequest, Result,
    VehicleType,
};
use catalog_store::{CatalogStore, MemoryStore};
use fipe_client::UpstreamClient;

pub fn cache() -> CatalogCache {
    CatalogCache::new(Arc::new(MokaBackend::new(10_000)), CacheConfig::default())
}

pub async fn seed_brand(store: &MemoryStore, code: &str, name: &str, vt: VehicleType) -> Brand {
    store
        .insert_brand(&NewBrand {
            codigo_fipe: code.into(),
            nome: name.into(),
            tipo_veiculo: vt,
        })
        .await
        .unwrap()
}

pub async fn seed_model(store: &MemoryStore, code: &str, name: &str, brand_id: i64) -> Model {
    store
        .insert_model(&NewModel {
            codigo_fipe: code.into(),
            nome: name.into(),
            brand_id,
        })
        .await
        .unwrap()
}

/// Upstream serving fixed brand lists; types without an entry fail.
#[derive(Default)]
pub struct StaticUpstream {
    brands: Mutex<HashMap<VehicleType, Vec<BrandRef>>>,
}

impl StaticUpstream {
    pub fn with_brands(self, vt: VehicleType, brands: &[(&str, &str)]) -> Self {
        self.brands.lock().insert(
            vt,
            brands
                .iter()
                .map(|(codigo, nome)| BrandRef {
                    codigo: codigo.to_string(),
                    nome: nome.to_string(),
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl UpstreamClient for StaticUpstream {
    async fn list_brands(&self, vehicle_type: VehicleType) -> Result<Vec<BrandRef>> {
        self.brands
            .lock()
            .get(&vehicle_type)
            .cloned()
            .ok_or_else(|| Error::upstream(format!("{} unavailable", vehicle_type)))
    }

    async fn list_models(&self, _vehicle_type: VehicleType, _brand_code: &str) -> Result<Vec<ModelRef>> {
        Ok(Vec::new())
    }
}

/// Store whose next `list_models` call pauses after reading until released.
pub struct GatedStore {
    pub inner: Arc<MemoryStore>,
    armed: Mutex<bool>,
    pub read_done: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            armed: Mutex::new(true),
            read_done: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl CatalogStore for GatedStore {
    async fn find_brand(&self, code: &str) -> Result<Option<Brand>> {
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
        self.inner.find_model(code).await
    }

    async fn insert_model(&self, model: &NewModel) -> Result<Model> {
        self.inner.insert_model(model).await
    }

    async fn list_models(&self, brand_id: i64, page: PageRequest) -> Result<Vec<Model>> {
        let models = self.inner.list_models(brand_id, page).await?;
        let gated = std::mem::replace(&mut *self.armed.lock(), false);
        if gated {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        Ok(models)
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
