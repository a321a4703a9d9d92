//! Storage seam shared by the Postgres and in-memory stores.

use async_trait::async_trait;

use catalog_core::{Brand, Model, ModelUpdate, NewBrand, NewModel, PageRequest, Result, VehicleType};

/// Brand and model persistence.
///
/// Every method is its own unit of work; there is no cross-call transaction.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_brand(&self, code: &str) -> Result<Option<Brand>>;

    /// Insert a brand. `Error::DuplicateKey` if the code exists.
    async fn insert_brand(&self, brand: &NewBrand) -> Result<Brand>;

    /// Brands ordered by name then code, optionally of one vehicle type.
    async fn list_brands(
        &self,
        vehicle_type: Option<VehicleType>,
        page: PageRequest,
    ) -> Result<Vec<Brand>>;

    async fn count_brands(&self, vehicle_type: Option<VehicleType>) -> Result<u64>;

    async fn find_model(&self, code: &str) -> Result<Option<Model>>;

    async fn model_exists(&self, code: &str) -> Result<bool> {
        Ok(self.find_model(code).await?.is_some())
    }

    /// Insert a model. `Error::DuplicateKey` if the code exists.
    async fn insert_model(&self, model: &NewModel) -> Result<Model>;

    /// Models of one brand ordered by name then code.
    async fn list_models(&self, brand_id: i64, page: PageRequest) -> Result<Vec<Model>>;

    /// Models of one brand, or of the whole catalog.
    async fn count_models(&self, brand_id: Option<i64>) -> Result<u64>;

    /// Apply `update` and refresh `data_atualizacao`. `None` if no such model.
    async fn update_model(&self, code: &str, update: &ModelUpdate) -> Result<Option<Model>>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<()>;
}
