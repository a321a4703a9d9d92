//! FIPE Catalog Ingestion
//!
//! Vehicle brand/model ingestion pipeline:
//! - REST API for catalog reads, manual brand creation and the initial load
//! - Redpanda (or in-memory) queue between the API and the processing worker
//! - Worker fetching models from the FIPE API into PostgreSQL
//! - moka cache with versioned invalidation in front of every read

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use api::{router, AppState};
use catalog_cache::{CacheConfig, CatalogCache, MokaBackend};
use catalog_service::{CatalogService, QueryService};
use catalog_store::{CatalogStore, PostgresStore, StoreConfig};
use fipe_client::{FipeClient, UpstreamClient, UpstreamConfig};
use redpanda::{
    BrandPublisher, Consumer, InMemoryBroker, MessagePublisher, MessageSource, Producer,
    RedpandaConfig,
};
use telemetry::init_tracing_from_env;
use worker::{
    ConsumerWorker, ConsumerWorkerConfig, HealthProbes, IngestionProcessor, ProcessorConfig,
    WorkerConfig, WorkerScheduler,
};

/// Which parts of the pipeline this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    #[default]
    All,
    Api,
    Worker,
}

impl Role {
    fn serves_http(self) -> bool {
        matches!(self, Role::All | Role::Api)
    }

    fn consumes(self) -> bool {
        matches!(self, Role::All | Role::Worker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueueBackend {
    #[default]
    Redpanda,
    /// Single-process queue; only meaningful with `role = all`.
    Memory,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    queue_backend: QueueBackend,

    #[serde(default)]
    database: StoreConfig,
    #[serde(default)]
    redpanda: RedpandaConfig,
    #[serde(default)]
    upstream: UpstreamConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    processing: ProcessorConfig,
    #[serde(default)]
    worker: ConsumerWorkerConfig,
    #[serde(default)]
    scheduler: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            role: Role::default(),
            queue_backend: QueueBackend::default(),
            database: StoreConfig::default(),
            redpanda: RedpandaConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            processing: ProcessorConfig::default(),
            worker: ConsumerWorkerConfig::default(),
            scheduler: WorkerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ needs a process-wide crypto provider before any TLS use
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting FIPE catalog ingestion v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        role = ?config.role,
        queue_backend = ?config.queue_backend,
        brokers = ?config.redpanda.brokers,
        upstream = %config.upstream.base_url,
        "Loaded configuration"
    );

    if config.queue_backend == QueueBackend::Memory && config.role != Role::All {
        warn!("In-memory queue with a split role: messages never leave this process");
    }

    let store: Arc<dyn CatalogStore> = Arc::new(
        PostgresStore::connect(&config.database)
            .await
            .context("Failed to connect to PostgreSQL")?,
    );

    let cache = CatalogCache::new(
        Arc::new(MokaBackend::new(config.cache.max_capacity)),
        config.cache.clone(),
    );

    let upstream: Arc<dyn UpstreamClient> = Arc::new(
        FipeClient::new(&config.upstream).context("Failed to create FIPE client")?,
    );

    let (transport, source) = build_queue(&config).await;

    let probes = HealthProbes {
        broker: transport.clone(),
        store: store.clone(),
        upstream: upstream.clone(),
    };
    probes.check().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.role.consumes() {
        let processor = Arc::new(IngestionProcessor::new(
            store.clone(),
            upstream.clone(),
            cache.clone(),
            config.processing.clone(),
        ));
        let consumer = Arc::new(ConsumerWorker::with_config(
            source,
            processor,
            config.worker.clone(),
        ));
        WorkerScheduler::with_consumer(config.scheduler.clone(), probes, consumer)
    } else {
        WorkerScheduler::new(config.scheduler.clone(), probes)
    };
    let worker_handles = Arc::new(scheduler).start(shutdown_rx);

    if config.role.serves_http() {
        let state = AppState::new(
            QueryService::new(store.clone(), cache.clone()),
            CatalogService::new(
                store.clone(),
                cache.clone(),
                BrandPublisher::new(transport.clone()),
                upstream.clone(),
            ),
        );
        let app = router(state);

        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .context("Invalid server address")?;

        info!("Listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind to address")?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
    } else {
        shutdown_signal().await;
    }

    info!("Shutting down...");

    // Workers finish the batch in hand before exiting.
    let _ = shutdown_tx.send(true);
    let drain = join_workers(worker_handles);
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
        warn!("Workers did not stop within 30s");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn join_workers(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }
}

/// Build the publish and receive ends of the brand queue.
async fn build_queue(config: &Config) -> (Arc<dyn MessagePublisher>, Arc<dyn MessageSource>) {
    match config.queue_backend {
        QueueBackend::Memory => {
            let broker = Arc::new(InMemoryBroker::new(config.redpanda.consumer.max_deliveries));
            info!("Using in-memory queue");
            let transport: Arc<dyn MessagePublisher> = broker.clone();
            let source: Arc<dyn MessageSource> = broker;
            (transport, source)
        }
        QueueBackend::Redpanda => {
            if let Err(e) = redpanda::health::ensure_topics(&config.redpanda).await {
                // Topics may be managed externally or the broker may come up later.
                warn!("Could not ensure Redpanda topics: {}", e);
            }
            let producer = Arc::new(Producer::new(config.redpanda.clone()));
            let source: Arc<dyn MessageSource> =
                Arc::new(Consumer::new(config.redpanda.clone(), producer.clone()));
            let transport: Arc<dyn MessagePublisher> = producer;
            (transport, source)
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. FIPE__PROCESSING__MAX_RETRIES
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FIPE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the settings deployments set most often
    if let Ok(url) = std::env::var("FIPE_DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(brokers) = std::env::var("FIPE_REDPANDA_BROKERS") {
        config.redpanda.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(username) = std::env::var("FIPE_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("FIPE_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Ok(url) = std::env::var("FIPE_UPSTREAM_URL") {
        config.upstream.base_url = url;
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
