//! Mock implementations for testing.

use async_trait::async_trait;
use catalog_core::{BrandRef, Error, ModelRef, Result, VehicleType};
use fipe_client::UpstreamClient;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Mock FIPE API serving canned brand and model lists from memory.
///
/// Implements the same `UpstreamClient` trait as the real `FipeClient`,
/// so the API and worker run their production code paths against it.
#[derive(Clone, Default)]
pub struct MockUpstream {
    /// Brand lists per vehicle type. Types without an entry have no brands.
    brands: Arc<Mutex<HashMap<VehicleType, Vec<BrandRef>>>>,
    /// Model lists per brand code.
    models: Arc<Mutex<HashMap<String, Vec<ModelRef>>>>,
    /// Brands whose model fetch always fails.
    broken_brands: Arc<Mutex<HashSet<String>>>,
    /// Fail every brand list request.
    should_fail: Arc<Mutex<bool>>,
    model_calls: Arc<Mutex<u32>>,
}

fn refs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(codigo, nome)| (codigo.to_string(), nome.to_string()))
        .collect()
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brands(self, vehicle_type: VehicleType, brands: &[(&str, &str)]) -> Self {
        let brands = refs(brands)
            .into_iter()
            .map(|(codigo, nome)| BrandRef { codigo, nome })
            .collect();
        self.brands.lock().insert(vehicle_type, brands);
        self
    }

    pub fn with_models(self, brand_code: &str, models: &[(&str, &str)]) -> Self {
        let models = refs(models)
            .into_iter()
            .map(|(codigo, nome)| ModelRef { codigo, nome })
            .collect();
        self.models.lock().insert(brand_code.to_string(), models);
        self
    }

    /// Make every model fetch for `brand_code` fail with a 503.
    pub fn break_brand(&self, brand_code: &str) {
        self.broken_brands.lock().insert(brand_code.to_string());
    }

    /// Set failure mode for brand list requests.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Number of model list requests served or failed so far.
    pub fn model_calls(&self) -> u32 {
        *self.model_calls.lock()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn list_brands(&self, vehicle_type: VehicleType) -> Result<Vec<BrandRef>> {
        if *self.should_fail.lock() {
            return Err(Error::upstream(format!("GET /{}/marcas: HTTP 503", vehicle_type)));
        }
        Ok(self
            .brands
            .lock()
            .get(&vehicle_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_models(&self, vehicle_type: VehicleType, brand_code: &str) -> Result<Vec<ModelRef>> {
        *self.model_calls.lock() += 1;
        if self.broken_brands.lock().contains(brand_code) {
            return Err(Error::upstream(format!(
                "GET /{}/marcas/{}/modelos: HTTP 503",
                vehicle_type, brand_code
            )));
        }
        Ok(self
            .models
            .lock()
            .get(brand_code)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_upstream_serves_canned_lists() {
        let mock = MockUpstream::new()
            .with_brands(VehicleType::Motos, &[("77", "Honda")])
            .with_models("77", &[("5001", "CG 160")]);

        let brands = mock.list_brands(VehicleType::Motos).await.unwrap();
        assert_eq!(brands[0].nome, "Honda");
        assert!(mock.list_brands(VehicleType::Carros).await.unwrap().is_empty());

        let models = mock.list_models(VehicleType::Motos, "77").await.unwrap();
        assert_eq!(models[0].codigo, "5001");
        assert_eq!(mock.model_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_upstream_failure_modes() {
        let mock = MockUpstream::new().with_models("21", &[("1", "Uno")]);
        mock.break_brand("21");
        assert!(matches!(
            mock.list_models(VehicleType::Carros, "21").await,
            Err(Error::UpstreamUnavailable(_))
        ));

        mock.set_should_fail(true);
        assert!(mock.list_brands(VehicleType::Carros).await.is_err());
    }
}
