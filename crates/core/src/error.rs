//! Unified error types for the catalog pipeline.
//!
//! Error codes:
//! - VALID_001-002: Validation / malformed payload errors
//! - NOT_FOUND, CONFLICT, DUPLICATE: Lookup and uniqueness errors
//! - UPSTREAM_001: FIPE API unavailable after retries
//! - QUEUE_001: Queue publish failures
//! - DB_001: Database errors
//! - INTERNAL: Anything unexpected

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the catalog pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing request/message field. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced brand or model does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Explicit creation of something that already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unique key collision on insert. Store upserts treat this as "already present".
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// FIPE API still failing after bounded retries.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// One or more queue sends failed.
    #[error("publish failed: {message}")]
    Publish { message: String, failures: Vec<String> },

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a publish error from a single failed send.
    pub fn publish(msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self::Publish {
            failures: vec![message.clone()],
            message,
        }
    }

    /// Aggregate several failed sends into one error.
    pub fn publish_many(failures: Vec<String>, total: usize) -> Self {
        Self::Publish {
            message: format!("{} of {} messages failed to publish", failures.len(), total),
            failures,
        }
    }

    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALID_001",
            Self::Serialization(_) => "VALID_002",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::DuplicateKey(_) => "DUPLICATE",
            Self::UpstreamUnavailable(_) => "UPSTREAM_001",
            Self::Publish { .. } => "QUEUE_001",
            Self::Database(_) => "DB_001",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::DuplicateKey(_) => 409,
            Self::UpstreamUnavailable(_) => 502,
            Self::Publish { .. } => 503,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Whether a redelivery of the same input could succeed.
    ///
    /// Validation and payload errors are permanent; everything else is
    /// worth another attempt later.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_)
                | Self::Serialization(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
                | Self::DuplicateKey(_)
        )
    }
}
