//! Worker scheduler for background tasks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info, warn};

use catalog_store::CatalogStore;
use fipe_client::UpstreamClient;
use redpanda::MessagePublisher;
use telemetry::{health, metrics, ComponentHealth};

use crate::consumer::ConsumerWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Health probe interval
    pub health_check_interval_secs: u64,
    /// Metrics summary log interval
    pub metrics_log_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            health_check_interval_secs: 30,
            metrics_log_interval_secs: 60,
        }
    }
}

/// Dependencies whose reachability feeds the health registry.
#[derive(Clone)]
pub struct HealthProbes {
    pub broker: Arc<dyn MessagePublisher>,
    pub store: Arc<dyn CatalogStore>,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl HealthProbes {
    /// Probe every dependency once and record the result.
    pub async fn check(&self) {
        let (broker, store, upstream) = tokio::join!(
            self.broker.health_check(),
            self.store.ping(),
            self.upstream.ping()
        );

        record(&health().broker, broker, || "connection failed".to_string());
        record(&health().database, store.is_ok(), || match &store {
            Err(e) => e.to_string(),
            Ok(()) => String::new(),
        });
        record(&health().upstream, upstream.is_ok(), || match &upstream {
            Err(e) => e.to_string(),
            Ok(()) => String::new(),
        });
    }
}

fn record(component: &ComponentHealth, healthy: bool, message: impl FnOnce() -> String) {
    let was_healthy = component.is_healthy();
    if healthy {
        component.set_healthy();
        if !was_healthy {
            info!(component = component.name(), "Component healthy");
        }
    } else {
        let message = message();
        if was_healthy {
            warn!(component = component.name(), error = %message, "Component unhealthy");
        }
        component.set_unhealthy(message);
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    probes: HealthProbes,
    consumer: Option<Arc<ConsumerWorker>>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, probes: HealthProbes) -> Self {
        Self {
            config,
            probes,
            consumer: None,
        }
    }

    /// Creates a new scheduler that also runs the brand consumer.
    pub fn with_consumer(
        config: WorkerConfig,
        probes: HealthProbes,
        consumer: Arc<ConsumerWorker>,
    ) -> Self {
        Self {
            config,
            probes,
            consumer: Some(consumer),
        }
    }

    /// Starts all background workers. They exit when `shutdown` turns true.
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(ref consumer) = self.consumer {
            let consumer = consumer.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = consumer.run(shutdown).await {
                    error!("Consumer worker fatal error: {}", e);
                }
            }));
            info!("Consumer worker started");
        }

        let scheduler = self.clone();
        let rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_checks(rx).await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log(shutdown).await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_health_checks(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.config.health_check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => self.probes.check().await,
            }
        }
    }

    async fn run_metrics_log(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.config.metrics_log_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let s = metrics().snapshot();
                    info!(
                        published = s.messages_published,
                        consumed = s.messages_consumed,
                        acked = s.messages_acked,
                        nacked = s.messages_nacked,
                        dead_lettered = s.messages_dead_lettered,
                        brands_processed = s.brands_processed,
                        models_inserted = s.models_inserted,
                        upstream_errors = s.upstream_errors,
                        consumer_lag = s.consumer_lag,
                        "Pipeline metrics"
                    );
                }
            }
        }
    }
}
