//! Consumer worker reading brand messages and running the processor.
//!
//! Each delivery goes through:
//! 1. Received
//! 2. Validating (decode + field checks, failures nacked as invalid)
//! 3. Processing (IngestionProcessor)
//! 4. Acknowledged, or NegativelyAcknowledged for the broker to redeliver
//!
//! A delivery is never acked before its processing finished.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use catalog_core::{BrandMessage, Result};
use redpanda::{Delivery, MessageSource, NackReason};
use telemetry::metrics;

use crate::processor::IngestionProcessor;

/// Consumer worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerWorkerConfig {
    /// Deliveries processed at once
    pub concurrency: usize,
    /// Deliveries requested per receive
    pub batch_size: usize,
    /// Pause after a failed receive
    pub error_backoff_ms: u64,
}

impl Default for ConsumerWorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            batch_size: 16,
            error_backoff_ms: 1000,
        }
    }
}

/// Where a delivery ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Received,
    Validating,
    Processing,
    Acknowledged,
    NegativelyAcknowledged(NackReason),
}

/// Worker that drains the brand queue into the processor.
pub struct ConsumerWorker {
    source: Arc<dyn MessageSource>,
    processor: Arc<IngestionProcessor>,
    permits: Arc<Semaphore>,
    config: ConsumerWorkerConfig,
}

impl ConsumerWorker {
    pub fn new(source: Arc<dyn MessageSource>, processor: Arc<IngestionProcessor>) -> Self {
        Self::with_config(source, processor, ConsumerWorkerConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn MessageSource>,
        processor: Arc<IngestionProcessor>,
        config: ConsumerWorkerConfig,
    ) -> Self {
        Self {
            source,
            processor,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
        }
    }

    /// Main run loop: receive, process, settle. Returns once `shutdown`
    /// flips to true; a batch already received is finished first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            concurrency = self.config.concurrency,
            batch_size = self.config.batch_size,
            "Consumer worker starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.source.receive(self.config.batch_size) => received,
            };

            match received {
                Ok(batch) if batch.is_empty() => {}
                Ok(batch) => {
                    let count = batch.len();
                    self.process_batch(batch).await;
                    debug!(count, "Processed batch");
                }
                Err(e) => {
                    error!("Receive error: {}", e);
                    tokio::time::sleep(Duration::from_millis(self.config.error_backoff_ms)).await;
                }
            }
        }

        info!("Consumer worker stopped");
        Ok(())
    }

    /// Receive one batch and process it to completion. Returns the number
    /// of deliveries handled.
    pub async fn poll_once(&self) -> Result<usize> {
        let batch = self.source.receive(self.config.batch_size).await?;
        let count = batch.len();
        if count > 0 {
            self.process_batch(batch).await;
        }
        Ok(count)
    }

    /// Process a batch, at most `concurrency` deliveries at a time.
    pub async fn process_batch(&self, batch: Vec<Delivery>) -> Vec<DeliveryState> {
        let mut tasks = Vec::with_capacity(batch.len());

        for delivery in batch {
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Semaphore closed: {}", e);
                    break;
                }
            };
            let source = self.source.clone();
            let processor = self.processor.clone();

            let task = delivery.clone();
            let handle = tokio::spawn(async move {
                let state = handle_delivery(source.as_ref(), &processor, task).await;
                drop(permit);
                state
            });
            tasks.push((delivery, handle));
        }

        let (deliveries, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        let mut states = Vec::with_capacity(results.len());
        for (delivery, result) in deliveries.iter().zip(results) {
            match result {
                Ok(state) => states.push(state),
                Err(e) => {
                    // The task died before settling; hand the delivery back.
                    error!(id = delivery.id, error = %e, "Delivery task panicked");
                    states.push(settle(self.source.as_ref(), delivery, Some(NackReason::Failed)).await);
                }
            }
        }
        states
    }
}

/// Keeps the in-flight gauge balanced even if processing unwinds.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        metrics().in_flight_deliveries.inc();
        Self
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics().in_flight_deliveries.dec();
    }
}

/// Drive one delivery through the state machine.
pub async fn handle_delivery(
    source: &dyn MessageSource,
    processor: &IngestionProcessor,
    delivery: Delivery,
) -> DeliveryState {
    let mut state = DeliveryState::Received;
    metrics().messages_consumed.inc();
    let _in_flight = InFlight::enter();
    debug!(id = delivery.id, attempt = delivery.attempt, state = ?state, "Delivery received");

    state = DeliveryState::Validating;
    let checked = BrandMessage::from_bytes(&delivery.payload)
        .and_then(|msg| msg.check().map(|vehicle_type| (msg, vehicle_type)));

    let (message, vehicle_type) = match checked {
        Ok(checked) => checked,
        Err(e) => {
            warn!(id = delivery.id, state = ?state, error = %e, "Rejecting invalid message");
            return settle(source, &delivery, Some(NackReason::Invalid)).await;
        }
    };

    state = DeliveryState::Processing;
    debug!(id = delivery.id, brand_code = %message.codigo_marca, state = ?state, "Processing delivery");

    let outcome = match processor
        .process(&message.codigo_marca, &message.nome_marca, vehicle_type)
        .await
    {
        Ok(_) => None,
        Err(e) => {
            warn!(
                id = delivery.id,
                brand_code = %message.codigo_marca,
                attempt = delivery.attempt,
                error = %e,
                "Processing failed, returning delivery"
            );
            Some(NackReason::Failed)
        }
    };

    settle(source, &delivery, outcome).await
}

async fn settle(
    source: &dyn MessageSource,
    delivery: &Delivery,
    nack: Option<NackReason>,
) -> DeliveryState {
    match nack {
        None => {
            if let Err(e) = source.ack(delivery).await {
                error!(id = delivery.id, error = %e, "Ack failed");
            }
            metrics().messages_acked.inc();
            DeliveryState::Acknowledged
        }
        Some(reason) => {
            if let Err(e) = source.nack(delivery, reason).await {
                error!(id = delivery.id, reason = %reason, error = %e, "Nack failed");
            }
            metrics().messages_nacked.inc();
            DeliveryState::NegativelyAcknowledged(reason)
        }
    }
}
