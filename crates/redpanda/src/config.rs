//! Redpanda configuration.

use serde::{Deserialize, Serialize};

use crate::topics::topic;

/// Broker connection and topic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    /// Work topic carrying brand messages
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Where rejected or exhausted messages end up
    #[serde(default = "default_dlq_topic")]
    pub dlq_topic: String,
    /// SASL/SCRAM-SHA-256 username; enables TLS when set with a password
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_topic() -> String {
    topic::BRAND_PROCESSING.to_string()
}

fn default_dlq_topic() -> String {
    topic::BRAND_PROCESSING_DLQ.to_string()
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            topic: default_topic(),
            dlq_topic: default_dlq_topic(),
            sasl_username: None,
            sasl_password: None,
            consumer: ConsumerConfig::default(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(u), Some(p)) if !u.is_empty() => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

/// Where a fresh consumer starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    /// Replay everything retained; safe because processing is idempotent.
    #[default]
    Earliest,
    Latest,
}

/// Consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Logical group name, used in logs
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// Maximum bytes fetched per poll
    #[serde(default = "default_max_fetch_bytes")]
    pub max_fetch_bytes: i32,
    /// How long a fetch waits for new records in milliseconds
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default)]
    pub start_offset: StartOffset,
    /// Deliveries of one message before it is dead-lettered
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
}

fn default_group_id() -> String {
    "fipe-brand-processor".to_string()
}

fn default_max_fetch_bytes() -> i32 {
    1024 * 1024
}

fn default_batch_timeout_ms() -> u64 {
    1000
}

fn default_max_deliveries() -> u32 {
    5
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            max_fetch_bytes: default_max_fetch_bytes(),
            batch_timeout_ms: default_batch_timeout_ms(),
            start_offset: StartOffset::default(),
            max_deliveries: default_max_deliveries(),
        }
    }
}
