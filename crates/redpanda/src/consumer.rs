//! Redpanda consumer for brand messages.
//!
//! Uses rskafka with manual offsets for at-least-once delivery:
//! - a fetched batch is committed only once every record in it is settled
//! - a nack republishes the record with a bumped attempt header, or routes
//!   it to the dead-letter topic
//! - if a republish fails the offset rewinds so the record is fetched again

use async_trait::async_trait;
use parking_lot::Mutex;
use rskafka::client::partition::{OffsetAt, PartitionClient};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use catalog_core::{Error, Result};

use crate::client::{connect, partition_client};
use crate::config::{RedpandaConfig, StartOffset};
use crate::producer::Producer;
use crate::topics::header;
use crate::transport::{Delivery, MessageSource, NackReason};

/// Offsets of the batch currently being processed.
#[derive(Debug, Default)]
struct InFlight {
    outstanding: HashSet<i64>,
    /// Next offset once everything is settled.
    commit_to: Option<i64>,
    /// Earliest offset that must be fetched again.
    rewind_to: Option<i64>,
}

/// Consumer reading partition 0 of the work topic.
pub struct Consumer {
    config: RedpandaConfig,
    /// Used to republish nacked records and feed the dead-letter topic
    producer: Arc<Producer>,
    partition_client: RwLock<Option<Arc<PartitionClient>>>,
    /// Next offset to read
    current_offset: AtomicI64,
    initialized: AtomicBool,
    in_flight: Mutex<InFlight>,
}

impl Consumer {
    pub fn new(config: RedpandaConfig, producer: Arc<Producer>) -> Self {
        info!(
            group_id = %config.consumer.group_id,
            topic = %config.topic,
            dlq = %config.dlq_topic,
            "Creating Redpanda consumer"
        );

        Self {
            config,
            producer,
            partition_client: RwLock::new(None),
            current_offset: AtomicI64::new(-1),
            initialized: AtomicBool::new(false),
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        {
            let client = self.partition_client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let cluster = connect(&self.config).await?;
        let partition_client = partition_client(&cluster, &self.config.topic).await?;

        if !self.initialized.load(Ordering::SeqCst) {
            let at = match self.config.consumer.start_offset {
                StartOffset::Earliest => OffsetAt::Earliest,
                StartOffset::Latest => OffsetAt::Latest,
            };
            let offset = partition_client
                .get_offset(at)
                .await
                .map_err(|e| Error::internal(format!("Failed to get offset: {}", e)))?;

            self.current_offset.store(offset, Ordering::SeqCst);
            self.initialized.store(true, Ordering::SeqCst);

            info!(
                topic = %self.config.topic,
                partition = 0,
                offset,
                "Consumer initialized at offset"
            );
        }

        *self.partition_client.write().await = Some(partition_client.clone());
        Ok(partition_client)
    }

    /// Resets the connection (for error recovery).
    pub async fn reset_connection(&self) {
        *self.partition_client.write().await = None;
        info!("Consumer connection reset");
    }

    pub fn current_offset(&self) -> i64 {
        self.current_offset.load(Ordering::SeqCst)
    }

    /// Mark one offset settled; commits when the batch is complete.
    fn settle(&self, offset: i64, rewind: bool) {
        let mut in_flight = self.in_flight.lock();
        in_flight.outstanding.remove(&offset);
        if rewind {
            in_flight.rewind_to = Some(in_flight.rewind_to.map_or(offset, |r| r.min(offset)));
        }

        if in_flight.outstanding.is_empty() {
            if let Some(commit_to) = in_flight.commit_to.take() {
                let next = in_flight.rewind_to.take().unwrap_or(commit_to);
                let prev = self.current_offset.swap(next, Ordering::SeqCst);
                debug!(prev_offset = prev, new_offset = next, "Committed offset");
            }
        }
    }

    async fn republish(&self, delivery: &Delivery, reason: NackReason) -> Result<bool> {
        let max = self.config.consumer.max_deliveries;
        let dead_letter = reason == NackReason::Invalid || delivery.attempt >= max;

        let mut headers = BTreeMap::new();
        let topic = if dead_letter {
            headers.insert(
                header::DELIVERY_ATTEMPT.to_string(),
                delivery.attempt.to_string().into_bytes(),
            );
            headers.insert(header::NACK_REASON.to_string(), reason.as_str().as_bytes().to_vec());
            &self.config.dlq_topic
        } else {
            headers.insert(
                header::DELIVERY_ATTEMPT.to_string(),
                (delivery.attempt + 1).to_string().into_bytes(),
            );
            &self.config.topic
        };

        self.producer
            .send_record(topic, delivery.key.as_deref(), delivery.payload.clone(), headers)
            .await?;
        Ok(dead_letter)
    }
}

fn attempt_of(headers: &BTreeMap<String, Vec<u8>>) -> u32 {
    headers
        .get(header::DELIVERY_ATTEMPT)
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

#[async_trait]
impl MessageSource for Consumer {
    async fn receive(&self, max: usize) -> Result<Vec<Delivery>> {
        if !self.in_flight.lock().outstanding.is_empty() {
            warn!("Previous batch not settled, skipping fetch");
            return Ok(Vec::new());
        }

        let client = self.ensure_connected().await?;
        let current = self.current_offset();
        let timeout = Duration::from_millis(self.config.consumer.batch_timeout_ms);

        let (records, high_watermark) = match client
            .fetch_records(
                current,
                1..self.config.consumer.max_fetch_bytes,
                timeout.as_millis() as i32,
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!("Fetch error: {}", e);
                self.reset_connection().await;
                return Err(Error::internal(format!("Failed to fetch records: {}", e)));
            }
        };

        let deliveries: Vec<Delivery> = records
            .into_iter()
            .filter(|r| r.offset >= current)
            .take(max.max(1))
            .map(|r| Delivery {
                id: r.offset,
                key: r
                    .record
                    .key
                    .as_deref()
                    .map(|k| String::from_utf8_lossy(k).into_owned()),
                attempt: attempt_of(&r.record.headers),
                payload: r.record.value.unwrap_or_default(),
            })
            .collect();

        let Some(last) = deliveries.last().map(|d| d.id) else {
            return Ok(Vec::new());
        };

        metrics()
            .consumer_lag
            .set(high_watermark.saturating_sub(last + 1).max(0) as u64);

        {
            let mut in_flight = self.in_flight.lock();
            in_flight.outstanding = deliveries.iter().map(|d| d.id).collect();
            in_flight.commit_to = Some(last + 1);
            in_flight.rewind_to = None;
        }

        debug!(
            count = deliveries.len(),
            offset_start = current,
            offset_end = last,
            high_watermark,
            "Fetched batch from Redpanda"
        );

        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.settle(delivery.id, false);
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, reason: NackReason) -> Result<()> {
        match self.republish(delivery, reason).await {
            Ok(dead_lettered) => {
                if dead_lettered {
                    metrics().messages_dead_lettered.inc();
                    warn!(
                        offset = delivery.id,
                        attempt = delivery.attempt,
                        reason = %reason,
                        "Record moved to dead-letter topic"
                    );
                }
                self.settle(delivery.id, false);
                Ok(())
            }
            Err(e) => {
                // Fetch it again rather than lose it.
                self.settle(delivery.id, true);
                Err(e)
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self.ensure_connected().await {
            Ok(_) => true,
            Err(e) => {
                error!("Consumer health check failed: {}", e);
                false
            }
        }
    }
}
