//! Broker connections.

use rskafka::client::{
    partition::{PartitionClient, UnknownTopicHandling},
    Client, ClientBuilder, Credentials, SaslConfig,
};
use std::sync::Arc;
use tracing::info;

use catalog_core::{Error, Result};

use crate::config::RedpandaConfig;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Connect to the cluster, with TLS + SCRAM when credentials are configured.
pub async fn connect(config: &RedpandaConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new(config.brokers.clone());

    if let Some((username, password)) = config.credentials() {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.to_string(),
                password.to_string(),
            )));
    }

    let client = builder
        .build()
        .await
        .map_err(|e| Error::internal(format!("Failed to connect to Redpanda: {}", e)))?;

    info!(brokers = %config.broker_string(), tls = config.credentials().is_some(), "Connected to Redpanda");
    Ok(client)
}

/// Client for partition 0 of `topic`.
pub async fn partition_client(client: &Client, topic: &str) -> Result<Arc<PartitionClient>> {
    let partition_client = client
        .partition_client(topic.to_string(), 0, UnknownTopicHandling::Error)
        .await
        .map_err(|e| {
            Error::internal(format!("Failed to get partition client for {}: {}", topic, e))
        })?;

    Ok(Arc::new(partition_client))
}
