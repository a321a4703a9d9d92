//! Redpanda producer using rskafka.

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient};
use rskafka::client::Client;
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error};

use catalog_core::{BrandMessage, Error, Result};
use telemetry::metrics;

use crate::client::{connect, partition_client};
use crate::config::RedpandaConfig;
use crate::health::check_connection;
use crate::topics::header;
use crate::transport::MessagePublisher;

/// Producer writing JSON brand messages keyed by brand code.
pub struct Producer {
    config: RedpandaConfig,
    client: RwLock<Option<Arc<Client>>>,
    /// Cached partition clients per topic
    partitions: RwLock<BTreeMap<String, Arc<PartitionClient>>>,
}

impl Producer {
    pub fn new(config: RedpandaConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            partitions: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &RedpandaConfig {
        &self.config
    }

    async fn cluster(&self) -> Result<Arc<Client>> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.client.write().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = Arc::new(connect(&self.config).await?);
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Gets or creates a partition client for a topic.
    async fn get_client(&self, topic: &str) -> Result<Arc<PartitionClient>> {
        {
            let partitions = self.partitions.read().await;
            if let Some(client) = partitions.get(topic) {
                return Ok(client.clone());
            }
        }

        let cluster = self.cluster().await?;
        let client = partition_client(&cluster, topic).await?;

        self.partitions
            .write()
            .await
            .insert(topic.to_string(), client.clone());

        Ok(client)
    }

    /// Drop cached connections so the next send reconnects.
    pub async fn reset(&self) {
        self.partitions.write().await.clear();
        *self.client.write().await = None;
    }

    /// Write one record and return its offset.
    pub async fn send_record(
        &self,
        topic: &str,
        key: Option<&str>,
        value: Vec<u8>,
        headers: BTreeMap<String, Vec<u8>>,
    ) -> Result<i64> {
        let start = Instant::now();
        let client = self.get_client(topic).await?;

        let record = Record {
            key: key.map(|k| k.as_bytes().to_vec()),
            value: Some(value),
            headers,
            timestamp: Utc::now(),
        };

        match client.produce(vec![record], Compression::NoCompression).await {
            Ok(offsets) => {
                let offset = offsets.first().copied().unwrap_or(-1);
                metrics().publish_latency_ms.observe_since(start);
                debug!(
                    topic = %topic,
                    offset,
                    latency_ms = %start.elapsed().as_millis(),
                    "Produced record"
                );
                Ok(offset)
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to produce record");
                self.reset().await;
                Err(Error::publish(format!("Failed to produce to {}: {}", topic, e)))
            }
        }
    }
}

#[async_trait]
impl MessagePublisher for Producer {
    async fn publish(&self, message: &BrandMessage) -> Result<()> {
        let payload = message.to_bytes()?;
        let mut headers = BTreeMap::new();
        headers.insert(header::DELIVERY_ATTEMPT.to_string(), b"1".to_vec());

        self.send_record(
            &self.config.topic,
            Some(&message.codigo_marca),
            payload,
            headers,
        )
        .await
        .map(|_| ())
    }

    async fn health_check(&self) -> bool {
        check_connection(&self.config).await
    }
}
