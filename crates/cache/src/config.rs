//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::key::CacheKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Brand entity TTL in seconds
    #[serde(default = "default_brand_ttl_secs")]
    pub brand_ttl_secs: u64,
    /// Model entity TTL in seconds
    #[serde(default = "default_model_ttl_secs")]
    pub model_ttl_secs: u64,
    /// Brand and model list TTL in seconds
    #[serde(default = "default_list_ttl_secs")]
    pub list_ttl_secs: u64,
    /// Counts and statistics TTL in seconds
    #[serde(default = "default_stats_ttl_secs")]
    pub stats_ttl_secs: u64,
}

fn default_max_capacity() -> u64 {
    50_000
}

fn default_brand_ttl_secs() -> u64 {
    6 * 3600
}

fn default_model_ttl_secs() -> u64 {
    4 * 3600
}

fn default_list_ttl_secs() -> u64 {
    2 * 3600
}

fn default_stats_ttl_secs() -> u64 {
    30 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            brand_ttl_secs: default_brand_ttl_secs(),
            model_ttl_secs: default_model_ttl_secs(),
            list_ttl_secs: default_list_ttl_secs(),
            stats_ttl_secs: default_stats_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        let secs = match kind {
            CacheKind::Brand => self.brand_ttl_secs,
            CacheKind::Model => self.model_ttl_secs,
            CacheKind::BrandList | CacheKind::ModelList => self.list_ttl_secs,
            CacheKind::Stats => self.stats_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}
