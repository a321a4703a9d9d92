//! Broker-agnostic queue seams.

use async_trait::async_trait;
use std::fmt;

use catalog_core::{BrandMessage, Result};

/// Sends brand messages to the work queue.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &BrandMessage) -> Result<()>;

    /// Whether the broker is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// One received message, not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-specific handle (offset for Redpanda).
    pub id: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    /// 1 on first delivery.
    pub attempt: u32,
}

/// Why a delivery was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackReason {
    /// Payload can never succeed; dead-letter immediately.
    Invalid,
    /// Processing failed; redeliver until attempts run out.
    Failed,
}

impl NackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pulls deliveries and settles them. Redelivery and dead-letter policy
/// belong to the implementation.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Up to `max` deliveries; may return empty after a short wait.
    async fn receive(&self, max: usize) -> Result<Vec<Delivery>>;

    async fn ack(&self, delivery: &Delivery) -> Result<()>;

    async fn nack(&self, delivery: &Delivery, reason: NackReason) -> Result<()>;

    async fn health_check(&self) -> bool {
        true
    }
}
