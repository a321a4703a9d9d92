//! Redpanda health checks and topic provisioning.

use std::collections::HashSet;
use tracing::{debug, error, info};

use catalog_core::{Error, Result};

use crate::client::connect;
use crate::config::RedpandaConfig;
use crate::topics::TopicConfig;

/// Check Redpanda connection health.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Redpanda unreachable");
            return false;
        }
    };

    match client.list_topics().await {
        Ok(topics) => {
            debug!(topics = topics.len(), "Redpanda connection healthy");
            true
        }
        Err(e) => {
            error!("Failed to list Redpanda topics: {}", e);
            false
        }
    }
}

/// Returns the configured topics that do not exist yet.
pub async fn missing_topics(config: &RedpandaConfig) -> Result<Vec<String>> {
    let client = connect(config).await?;
    let existing = client
        .list_topics()
        .await
        .map_err(|e| Error::internal(format!("Failed to list topics: {}", e)))?;
    let existing: HashSet<_> = existing.into_iter().map(|t| t.name).collect();

    Ok([&config.topic, &config.dlq_topic]
        .into_iter()
        .filter(|t| !existing.contains(*t))
        .cloned()
        .collect())
}

/// Create the work and dead-letter topics when absent.
pub async fn ensure_topics(config: &RedpandaConfig) -> Result<()> {
    let missing = missing_topics(config).await?;
    if missing.is_empty() {
        return Ok(());
    }

    let client = connect(config).await?;
    let controller = client
        .controller_client()
        .map_err(|e| Error::internal(format!("No controller available: {}", e)))?;

    for name in missing {
        let topic = TopicConfig::new(name);
        controller
            .create_topic(
                topic.name.clone(),
                topic.partitions,
                topic.replication_factor,
                5_000,
            )
            .await
            .map_err(|e| Error::internal(format!("Failed to create topic {}: {}", topic.name, e)))?;
        info!(topic = %topic.name, partitions = topic.partitions, "Created topic");
    }

    Ok(())
}
