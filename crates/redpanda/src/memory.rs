//! In-process broker for single-node runs and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

use catalog_core::{BrandMessage, Error, Result};
use telemetry::metrics;

use crate::transport::{Delivery, MessagePublisher, MessageSource, NackReason};

/// Dead letters kept for inspection; older ones are only counted.
pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1_000;

/// A message that left the work queue for good.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub delivery: Delivery,
    pub reason: NackReason,
}

#[derive(Default)]
struct State {
    next_id: i64,
    queue: VecDeque<Delivery>,
    in_flight: HashMap<i64, Delivery>,
    dead_letters: VecDeque<DeadLetter>,
    dead_lettered: u64,
    acked: u64,
}

/// Queue with the same settle semantics as the Redpanda consumer:
/// `Failed` is redelivered until `max_deliveries`, `Invalid` is
/// dead-lettered at once.
pub struct InMemoryBroker {
    state: Mutex<State>,
    notify: Notify,
    max_deliveries: u32,
    dead_letter_capacity: usize,
    poll_interval: Duration,
    fail_publish: AtomicBool,
}

impl InMemoryBroker {
    pub fn new(max_deliveries: u32) -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            max_deliveries: max_deliveries.max(1),
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
            poll_interval: Duration::from_millis(100),
            fail_publish: AtomicBool::new(false),
        }
    }

    /// How long an empty `receive` waits for new messages.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How many dead letters to retain.
    pub fn with_dead_letter_capacity(mut self, capacity: usize) -> Self {
        self.dead_letter_capacity = capacity;
        self
    }

    /// Enqueue raw bytes, bypassing serialization.
    pub fn publish_raw(&self, key: Option<&str>, payload: Vec<u8>) {
        {
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = state.next_id;
            state.queue.push_back(Delivery {
                id,
                key: key.map(str::to_string),
                payload,
                attempt: 1,
            });
        }
        self.notify.notify_one();
    }

    /// Make subsequent publishes fail, to exercise error paths.
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Messages received but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn acked(&self) -> u64 {
        self.state.lock().acked
    }

    /// The most recent dead letters, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().dead_letters.iter().cloned().collect()
    }

    /// Every message dead-lettered since start, retained or not.
    pub fn dead_lettered(&self) -> u64 {
        self.state.lock().dead_lettered
    }

    /// True when nothing is queued or in flight.
    pub fn is_drained(&self) -> bool {
        let state = self.state.lock();
        state.queue.is_empty() && state.in_flight.is_empty()
    }

    fn take(&self, max: usize) -> Vec<Delivery> {
        let mut state = self.state.lock();
        let n = max.max(1).min(state.queue.len());
        let batch: Vec<Delivery> = state.queue.drain(..n).collect();
        for d in &batch {
            state.in_flight.insert(d.id, d.clone());
        }
        batch
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(&self, message: &BrandMessage) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Error::publish(format!(
                "broker rejected brand {}",
                message.codigo_marca
            )));
        }
        self.publish_raw(Some(&message.codigo_marca), message.to_bytes()?);
        Ok(())
    }
}

#[async_trait]
impl MessageSource for InMemoryBroker {
    async fn receive(&self, max: usize) -> Result<Vec<Delivery>> {
        let batch = self.take(max);
        if !batch.is_empty() {
            return Ok(batch);
        }

        let _ = tokio::time::timeout(self.poll_interval, self.notify.notified()).await;
        Ok(self.take(max))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let mut state = self.state.lock();
        if state.in_flight.remove(&delivery.id).is_some() {
            state.acked += 1;
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, reason: NackReason) -> Result<()> {
        let requeued = {
            let mut state = self.state.lock();
            let Some(mut d) = state.in_flight.remove(&delivery.id) else {
                return Err(Error::internal(format!("unknown delivery {}", delivery.id)));
            };

            if reason == NackReason::Failed && d.attempt < self.max_deliveries {
                d.attempt += 1;
                debug!(id = d.id, attempt = d.attempt, "Requeued delivery");
                state.queue.push_back(d);
                true
            } else {
                warn!(id = d.id, attempt = d.attempt, reason = %reason, "Dead-lettered delivery");
                if state.dead_letters.len() >= self.dead_letter_capacity {
                    state.dead_letters.pop_front();
                }
                if self.dead_letter_capacity > 0 {
                    state.dead_letters.push_back(DeadLetter { delivery: d, reason });
                }
                state.dead_lettered += 1;
                metrics().messages_dead_lettered.inc();
                false
            }
        };

        if requeued {
            self.notify.notify_one();
        }
        Ok(())
    }
}
