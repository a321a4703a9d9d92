//! Cache-aside catalog reads and model edits.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use catalog_cache::{CacheKey, CatalogCache};
use catalog_core::{Brand, Error, Model, ModelUpdate, Page, PageRequest, Result, VehicleType};
use catalog_store::CatalogStore;
use telemetry::metrics;

/// Parse an optional vehicle type filter. Blank means "no filter".
pub fn parse_vehicle_type(raw: Option<&str>) -> Result<Option<VehicleType>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// Read side of the catalog.
///
/// Every read goes through [`CatalogCache`] first; writes invalidate the
/// namespaces they touch before returning.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn CatalogStore>,
    cache: CatalogCache,
}

impl QueryService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: CatalogCache) -> Self {
        Self { store, cache }
    }

    /// Brands ordered by name, optionally of one vehicle type.
    pub async fn list_brands(
        &self,
        vehicle_type: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Brand>> {
        let start = Instant::now();
        let vehicle_type = parse_vehicle_type(vehicle_type)?;

        let key = CacheKey::brand_list(vehicle_type, page);
        let result = self
            .cache
            .get_or_load(&key, || async {
                let items = self.store.list_brands(vehicle_type, page).await?;
                let total = self.count_brands_of(vehicle_type).await?;
                Ok(Page::new(items, page, total))
            })
            .await;

        metrics().query_latency_ms.observe_since(start);
        result
    }

    /// Models of one brand ordered by name. `NotFound` for unknown brands.
    pub async fn list_models_by_brand(
        &self,
        brand_code: &str,
        page: PageRequest,
    ) -> Result<Page<Model>> {
        let start = Instant::now();
        let brand = self.get_brand(brand_code).await?;

        let key = CacheKey::model_list(&brand.codigo_fipe, page);
        let result = self
            .cache
            .get_or_load(&key, || async {
                let items = self.store.list_models(brand.id, page).await?;
                let total = self.store.count_models(Some(brand.id)).await?;
                Ok(Page::new(items, page, total))
            })
            .await;

        metrics().query_latency_ms.observe_since(start);
        result
    }

    pub async fn get_brand(&self, code: &str) -> Result<Brand> {
        self.cache
            .get_or_load(&CacheKey::brand(code), || async {
                self.store
                    .find_brand(code)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("brand {}", code)))
            })
            .await
    }

    pub async fn get_model(&self, code: &str) -> Result<Model> {
        self.cache
            .get_or_load(&CacheKey::model(code), || async {
                self.store
                    .find_model(code)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("model {}", code)))
            })
            .await
    }

    pub async fn count_brands(&self, vehicle_type: Option<&str>) -> Result<u64> {
        let vehicle_type = parse_vehicle_type(vehicle_type)?;
        self.count_brands_of(vehicle_type).await
    }

    /// Models of one brand, or of the whole catalog.
    pub async fn count_models(&self, brand_code: Option<&str>) -> Result<u64> {
        let brand_id = match brand_code {
            Some(code) => Some(self.get_brand(code).await?.id),
            None => None,
        };

        self.cache
            .get_or_load(&CacheKey::model_count(brand_code), || async {
                self.store.count_models(brand_id).await
            })
            .await
    }

    /// Edit a model's name and/or observations.
    pub async fn update_model(&self, code: &str, update: ModelUpdate) -> Result<Model> {
        update.check()?;
        let model = self
            .store
            .update_model(code, &update)
            .await?
            .ok_or_else(|| Error::not_found(format!("model {}", code)))?;

        self.cache
            .invalidate_model(Some(&model.codigo_fipe), &model.codigo_marca)
            .await;

        info!(
            model_code = %model.codigo_fipe,
            brand_code = %model.codigo_marca,
            "Model updated"
        );
        Ok(model)
    }

    async fn count_brands_of(&self, vehicle_type: Option<VehicleType>) -> Result<u64> {
        self.cache
            .get_or_load(&CacheKey::brand_count(vehicle_type), || async {
                debug!(vehicle_type = ?vehicle_type, "Counting brands");
                self.store.count_brands(vehicle_type).await
            })
            .await
    }
}
