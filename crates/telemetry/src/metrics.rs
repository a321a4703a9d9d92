//! In-process metrics.
//!
//! Plain atomics behind a global registry; `/metrics` serves a JSON snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that can go up or down.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 30s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Observe the time elapsed since `start`.
    pub fn observe_since(&self, start: Instant) {
        self.observe(start.elapsed().as_millis() as u64);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Pipeline metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    // Publisher
    pub messages_published: Counter,
    pub publish_errors: Counter,
    pub publish_batches: Counter,

    // Consumer
    pub messages_consumed: Counter,
    pub messages_acked: Counter,
    pub messages_nacked: Counter,
    pub messages_dead_lettered: Counter,

    // Processor
    pub brands_processed: Counter,
    pub brands_created: Counter,
    pub processing_failures: Counter,
    pub models_inserted: Counter,
    pub models_skipped: Counter,
    pub models_failed: Counter,

    // Upstream
    pub upstream_requests: Counter,
    pub upstream_errors: Counter,
    pub upstream_retries: Counter,

    // Cache
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_errors: Counter,

    // Store
    pub db_errors: Counter,

    // Latency histograms
    pub upstream_latency_ms: Histogram,
    pub publish_latency_ms: Histogram,
    pub process_latency_ms: Histogram,
    pub query_latency_ms: Histogram,

    // Gauges
    pub in_flight_deliveries: Gauge,
    pub consumer_lag: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A point-in-time copy of the metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub messages_published: u64,
    pub publish_errors: u64,
    pub publish_batches: u64,
    pub messages_consumed: u64,
    pub messages_acked: u64,
    pub messages_nacked: u64,
    pub messages_dead_lettered: u64,
    pub brands_processed: u64,
    pub brands_created: u64,
    pub processing_failures: u64,
    pub models_inserted: u64,
    pub models_skipped: u64,
    pub models_failed: u64,
    pub upstream_requests: u64,
    pub upstream_errors: u64,
    pub upstream_retries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub db_errors: u64,
    pub upstream_latency_mean_ms: f64,
    pub publish_latency_mean_ms: f64,
    pub process_latency_mean_ms: f64,
    pub query_latency_mean_ms: f64,
    pub in_flight_deliveries: u64,
    pub consumer_lag: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            messages_published: self.messages_published.get(),
            publish_errors: self.publish_errors.get(),
            publish_batches: self.publish_batches.get(),
            messages_consumed: self.messages_consumed.get(),
            messages_acked: self.messages_acked.get(),
            messages_nacked: self.messages_nacked.get(),
            messages_dead_lettered: self.messages_dead_lettered.get(),
            brands_processed: self.brands_processed.get(),
            brands_created: self.brands_created.get(),
            processing_failures: self.processing_failures.get(),
            models_inserted: self.models_inserted.get(),
            models_skipped: self.models_skipped.get(),
            models_failed: self.models_failed.get(),
            upstream_requests: self.upstream_requests.get(),
            upstream_errors: self.upstream_errors.get(),
            upstream_retries: self.upstream_retries.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            cache_errors: self.cache_errors.get(),
            db_errors: self.db_errors.get(),
            upstream_latency_mean_ms: self.upstream_latency_ms.mean(),
            publish_latency_mean_ms: self.publish_latency_ms.mean(),
            process_latency_mean_ms: self.process_latency_ms.mean(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
            in_flight_deliveries: self.in_flight_deliveries.get(),
            consumer_lag: self.consumer_lag.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
