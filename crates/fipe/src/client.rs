//! FIPE HTTP client with bounded retries.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use catalog_core::{BrandRef, Error, ModelRef, Result, RetryPolicy, VehicleType};
use telemetry::metrics;

use crate::config::UpstreamConfig;

/// Read access to the external vehicle reference catalog.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// All brands of a vehicle type.
    async fn list_brands(&self, vehicle_type: VehicleType) -> Result<Vec<BrandRef>>;

    /// All models of one brand. Empty when the API has none.
    async fn list_models(&self, vehicle_type: VehicleType, brand_code: &str)
        -> Result<Vec<ModelRef>>;

    /// Cheap availability probe.
    async fn ping(&self) -> Result<()> {
        self.list_brands(VehicleType::Carros).await.map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    modelos: Option<Vec<ModelRef>>,
}

/// One failed HTTP attempt.
#[derive(Debug)]
struct FetchError {
    transient: bool,
    message: String,
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        Self {
            transient: e.is_timeout() || e.is_connect(),
            message: e.to_string(),
        }
    }

    fn from_status(status: StatusCode) -> Self {
        Self {
            transient: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
            message: format!("HTTP {}", status),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// reqwest-backed FIPE client.
#[derive(Clone)]
pub struct FipeClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl FipeClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| Error::internal(format!("invalid upstream url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::internal(format!(
                "upstream url '{}' cannot be a base",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry_policy(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let url = &url;
        self.retry
            .run(
                "fipe_get",
                |e: &FetchError| e.transient,
                |attempt| async move {
                    if attempt > 1 {
                        metrics().upstream_retries.inc();
                    }
                    self.fetch_once(url).await
                },
            )
            .await
            .map_err(|e| {
                metrics().upstream_errors.inc();
                warn!(url = %url, error = %e, "FIPE request failed");
                Error::upstream(format!("GET {}: {}", url.path(), e))
            })
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: &Url) -> std::result::Result<T, FetchError> {
        metrics().upstream_requests.inc();
        let start = Instant::now();

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body = response.json::<T>().await.map_err(|e| FetchError {
            transient: e.is_timeout(),
            message: format!("undecodable body: {}", e),
        })?;

        metrics().upstream_latency_ms.observe_since(start);
        Ok(body)
    }
}

#[async_trait]
impl UpstreamClient for FipeClient {
    async fn list_brands(&self, vehicle_type: VehicleType) -> Result<Vec<BrandRef>> {
        let url = self.url(&[vehicle_type.as_str(), "marcas"]);
        let brands: Vec<BrandRef> = self.get_json(url).await?;
        debug!(vehicle_type = %vehicle_type, count = brands.len(), "Fetched brands");
        Ok(brands)
    }

    async fn list_models(
        &self,
        vehicle_type: VehicleType,
        brand_code: &str,
    ) -> Result<Vec<ModelRef>> {
        let url = self.url(&[vehicle_type.as_str(), "marcas", brand_code, "modelos"]);
        let response: ModelsResponse = self.get_json(url).await?;
        let models = response.modelos.unwrap_or_default();
        debug!(
            vehicle_type = %vehicle_type,
            brand_code,
            count = models.len(),
            "Fetched models"
        );
        Ok(models)
    }
}
