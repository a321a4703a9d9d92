//! Brand ingestion: upsert the brand, fetch its models, insert the new ones.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use catalog_cache::CatalogCache;
use catalog_core::{Brand, Error, ModelRef, NewBrand, NewModel, Result, RetryPolicy, VehicleType};
use catalog_store::CatalogStore;
use fipe_client::UpstreamClient;
use telemetry::metrics;

/// Processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Attempts at fetching a brand's models
    pub max_retries: u32,
    /// Wait between model fetch attempts
    pub retry_delay_ms: u64,
    /// Pause after each model insert
    pub delay_between_requests_ms: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 5000,
            delay_between_requests_ms: 100,
        }
    }
}

impl ProcessorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }
}

/// What one `process` call did.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub brand: Brand,
    pub brand_created: bool,
    pub models_fetched: usize,
    pub models_inserted: usize,
    pub models_skipped: usize,
    pub models_failed: usize,
}

#[derive(Debug, Default)]
struct Tally {
    inserted: usize,
    skipped: usize,
    failed: usize,
}

/// Idempotent brand processing.
///
/// Running it twice for the same brand inserts nothing the second time;
/// unique keys in the store catch concurrent duplicates.
pub struct IngestionProcessor {
    store: Arc<dyn CatalogStore>,
    upstream: Arc<dyn UpstreamClient>,
    cache: CatalogCache,
    config: ProcessorConfig,
}

impl IngestionProcessor {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        upstream: Arc<dyn UpstreamClient>,
        cache: CatalogCache,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            upstream,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Store the brand if new, then insert every model the store lacks.
    ///
    /// Fails with `UpstreamUnavailable` when the model list cannot be
    /// fetched; the brand row is kept in that case.
    pub async fn process(
        &self,
        brand_code: &str,
        brand_name: &str,
        vehicle_type: VehicleType,
    ) -> Result<ProcessReport> {
        let start = Instant::now();
        let result = self.run(brand_code, brand_name, vehicle_type).await;
        metrics().process_latency_ms.observe_since(start);

        match &result {
            Ok(report) => {
                metrics().brands_processed.inc();
                info!(
                    brand_code,
                    vehicle_type = %vehicle_type,
                    brand_created = report.brand_created,
                    fetched = report.models_fetched,
                    inserted = report.models_inserted,
                    skipped = report.models_skipped,
                    failed = report.models_failed,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Brand processed"
                );
            }
            Err(e) => {
                metrics().processing_failures.inc();
                error!(brand_code, vehicle_type = %vehicle_type, error = %e, "Brand processing failed");
            }
        }
        result
    }

    async fn run(
        &self,
        brand_code: &str,
        brand_name: &str,
        vehicle_type: VehicleType,
    ) -> Result<ProcessReport> {
        let (brand, brand_created) = self.upsert_brand(brand_code, brand_name, vehicle_type).await?;

        let models = self.fetch_models(vehicle_type, &brand.codigo_fipe).await?;

        let mut tally = Tally::default();
        for model in &models {
            self.insert_model(&brand, model, &mut tally).await;
        }

        if tally.inserted > 0 {
            self.cache.invalidate_model(None, &brand.codigo_fipe).await;
        }

        Ok(ProcessReport {
            brand,
            brand_created,
            models_fetched: models.len(),
            models_inserted: tally.inserted,
            models_skipped: tally.skipped,
            models_failed: tally.failed,
        })
    }

    /// Existing brands are reused as they are.
    async fn upsert_brand(
        &self,
        code: &str,
        name: &str,
        vehicle_type: VehicleType,
    ) -> Result<(Brand, bool)> {
        if let Some(brand) = self.store.find_brand(code).await? {
            debug!(brand_code = code, "Brand already stored");
            return Ok((brand, false));
        }

        let new_brand = NewBrand {
            codigo_fipe: code.to_string(),
            nome: name.to_string(),
            tipo_veiculo: vehicle_type,
        };

        match self.store.insert_brand(&new_brand).await {
            Ok(brand) => {
                metrics().brands_created.inc();
                self.cache.invalidate_brand(&brand.codigo_fipe).await;
                Ok((brand, true))
            }
            // Another delivery of the same brand won the race.
            Err(Error::DuplicateKey(_)) => {
                let brand = self.store.find_brand(code).await?.ok_or_else(|| {
                    Error::internal(format!("brand {} vanished after duplicate insert", code))
                })?;
                Ok((brand, false))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_models(&self, vehicle_type: VehicleType, brand_code: &str) -> Result<Vec<ModelRef>> {
        self.config
            .retry_policy()
            .run("fetch_models", Error::is_transient, |_| {
                self.upstream.list_models(vehicle_type, brand_code)
            })
            .await
            .map_err(|e| match e {
                Error::UpstreamUnavailable(_) => e,
                other => Error::upstream(format!("models of brand {}: {}", brand_code, other)),
            })
    }

    async fn insert_model(&self, brand: &Brand, model: &ModelRef, tally: &mut Tally) {
        match self.store.model_exists(&model.codigo).await {
            Ok(true) => {
                tally.skipped += 1;
                metrics().models_skipped.inc();
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tally.failed += 1;
                metrics().models_failed.inc();
                warn!(model_code = %model.codigo, error = %e, "Model lookup failed, skipping");
                return;
            }
        }

        let new_model = NewModel {
            codigo_fipe: model.codigo.clone(),
            nome: model.nome.clone(),
            brand_id: brand.id,
        };

        match self.store.insert_model(&new_model).await {
            Ok(_) => {
                tally.inserted += 1;
                metrics().models_inserted.inc();
                let pause = self.config.pacing();
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
            Err(Error::DuplicateKey(_)) => {
                tally.skipped += 1;
                metrics().models_skipped.inc();
            }
            Err(e) => {
                tally.failed += 1;
                metrics().models_failed.inc();
                warn!(
                    model_code = %model.codigo,
                    brand_code = %brand.codigo_fipe,
                    error = %e,
                    "Model insert failed, skipping"
                );
            }
        }
    }
}
