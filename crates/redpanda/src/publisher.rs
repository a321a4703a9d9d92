//! Validating brand publisher.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use catalog_core::{BrandMessage, BrandRef, Error, Result};
use telemetry::metrics;

use crate::transport::MessagePublisher;

/// Outcome of a batch publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub published: usize,
}

/// Turns brand references into queue messages.
///
/// Everything is validated before the first send, so an invalid input
/// never results in a partial publish.
#[derive(Clone)]
pub struct BrandPublisher {
    transport: Arc<dyn MessagePublisher>,
}

impl BrandPublisher {
    pub fn new(transport: Arc<dyn MessagePublisher>) -> Self {
        Self { transport }
    }

    pub async fn publish(&self, brand_code: &str, brand_name: &str, vehicle_type: &str) -> Result<()> {
        let message = BrandMessage::new(brand_code, brand_name, vehicle_type)?;
        self.send(&message).await?;
        metrics().messages_published.inc();
        info!(
            brand_code = %message.codigo_marca,
            vehicle_type = %message.tipo_veiculo,
            "Published brand message"
        );
        Ok(())
    }

    /// Publish every brand concurrently. Fails with an aggregated
    /// `Error::Publish` if any send failed; sent messages are not recalled.
    pub async fn publish_batch(&self, brands: &[BrandRef], vehicle_type: &str) -> Result<BatchReport> {
        if brands.is_empty() {
            return Ok(BatchReport {
                total: 0,
                published: 0,
            });
        }

        let messages = brands
            .iter()
            .enumerate()
            .map(|(i, b)| {
                BrandMessage::new(&b.codigo, &b.nome, vehicle_type)
                    .map_err(|e| Error::validation(format!("brands[{}]: {}", i, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let start = Instant::now();
        let results = join_all(messages.iter().map(|m| self.send(m))).await;

        let total = messages.len();
        let failures: Vec<String> = messages
            .iter()
            .zip(results)
            .filter_map(|(m, r)| r.err().map(|e| format!("{}: {}", m.codigo_marca, e)))
            .collect();
        let published = total - failures.len();

        metrics().publish_batches.inc();
        metrics().messages_published.inc_by(published as u64);

        if !failures.is_empty() {
            error!(
                vehicle_type = %vehicle_type,
                total,
                failed = failures.len(),
                "Batch publish incomplete"
            );
            return Err(Error::publish_many(failures, total));
        }

        info!(
            vehicle_type = %vehicle_type,
            count = total,
            latency_ms = %start.elapsed().as_millis(),
            "Published brand batch"
        );
        Ok(BatchReport { total, published })
    }

    async fn send(&self, message: &BrandMessage) -> Result<()> {
        self.transport.publish(message).await.inspect_err(|e| {
            metrics().publish_errors.inc();
            error!(brand_code = %message.codigo_marca, error = %e, "Failed to publish brand message");
        })
    }

    pub async fn health_check(&self) -> bool {
        self.transport.health_check().await
    }
}
