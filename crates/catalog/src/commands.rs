//! Brand registration, initial load and catalog statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use catalog_cache::{CacheKey, CatalogCache};
use catalog_core::{Brand, CreateBrand, Error, Result, VehicleType};
use catalog_store::CatalogStore;
use fipe_client::UpstreamClient;
use redpanda::BrandPublisher;

/// Brands published for one vehicle type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLoad {
    pub vehicle_type: VehicleType,
    pub brands: usize,
    pub published: usize,
}

/// Result of an initial load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub types: Vec<TypeLoad>,
    pub total_published: usize,
}

/// Catalog size at a glance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub brands_by_type: BTreeMap<String, u64>,
    pub total_brands: u64,
    pub total_models: u64,
}

/// Write side of the catalog that feeds the processing queue.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    cache: CatalogCache,
    publisher: BrandPublisher,
    upstream: Arc<dyn UpstreamClient>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        cache: CatalogCache,
        publisher: BrandPublisher,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            upstream,
        }
    }

    /// Register a brand and queue it so its models get fetched.
    ///
    /// `Conflict` if the code is taken. A publish failure is returned as
    /// `Error::Publish`; the row is kept.
    pub async fn create_brand(&self, request: CreateBrand) -> Result<Brand> {
        let new_brand = request.into_new_brand()?;

        if self.store.find_brand(&new_brand.codigo_fipe).await?.is_some() {
            return Err(Error::conflict(format!(
                "brand {} already exists",
                new_brand.codigo_fipe
            )));
        }

        let brand = match self.store.insert_brand(&new_brand).await {
            Ok(brand) => brand,
            Err(Error::DuplicateKey(_)) => {
                return Err(Error::conflict(format!(
                    "brand {} already exists",
                    new_brand.codigo_fipe
                )))
            }
            Err(e) => return Err(e),
        };
        self.cache.invalidate_brand(&brand.codigo_fipe).await;

        info!(
            brand_code = %brand.codigo_fipe,
            vehicle_type = %brand.tipo_veiculo,
            "Brand created"
        );

        self.publisher
            .publish(&brand.codigo_fipe, &brand.nome, brand.tipo_veiculo.as_str())
            .await?;

        Ok(brand)
    }

    /// Fetch the brand list of every vehicle type and queue each brand.
    ///
    /// Stops at the first type whose fetch or publish fails.
    pub async fn initial_load(&self) -> Result<LoadSummary> {
        let mut types = Vec::with_capacity(VehicleType::ALL.len());

        for vehicle_type in VehicleType::ALL {
            let brands = self.upstream.list_brands(vehicle_type).await.map_err(|e| {
                error!(vehicle_type = %vehicle_type, error = %e, "Initial load fetch failed");
                e
            })?;

            let report = self
                .publisher
                .publish_batch(&brands, vehicle_type.as_str())
                .await?;

            info!(
                vehicle_type = %vehicle_type,
                brands = brands.len(),
                published = report.published,
                "Brands queued for processing"
            );
            types.push(TypeLoad {
                vehicle_type,
                brands: brands.len(),
                published: report.published,
            });
        }

        let total_published = types.iter().map(|t| t.published).sum();
        Ok(LoadSummary {
            types,
            total_published,
        })
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        self.cache
            .get_or_load(&CacheKey::catalog_stats(), || async {
                let mut brands_by_type = BTreeMap::new();
                for vt in VehicleType::ALL {
                    brands_by_type.insert(vt.to_string(), self.store.count_brands(Some(vt)).await?);
                }
                Ok(CatalogStats {
                    total_brands: brands_by_type.values().sum(),
                    brands_by_type,
                    total_models: self.store.count_models(None).await?,
                })
            })
            .await
    }
}
