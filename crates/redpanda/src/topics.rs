//! Topic and header definitions.

/// Topic names.
pub mod topic {
    pub const BRAND_PROCESSING: &str = "brand-processing";
    pub const BRAND_PROCESSING_DLQ: &str = "brand-processing-dlq";
}

/// Record headers.
pub mod header {
    /// 1-based delivery attempt of a republished record.
    pub const DELIVERY_ATTEMPT: &str = "x-delivery-attempt";
    /// Why a record was dead-lettered.
    pub const NACK_REASON: &str = "x-nack-reason";
}

/// Topic provisioning settings.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i16,
}

impl TopicConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            // Consumers read partition 0 only.
            partitions: 1,
            replication_factor: 1,
        }
    }
}
