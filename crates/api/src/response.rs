//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use catalog_core::Error;
use telemetry::{ComponentHealthReport, HealthStatus};

/// Envelope for accepted asynchronous work.
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T> AcceptedResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "accepted".to_string(),
            message: message.into(),
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
    pub timestamp: i64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type carrying the catalog error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    /// Body could not be parsed.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_002", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = err.code(), error = %err, "Request failed");
        }

        let response = ErrorResponse::new(err.to_string(), err.code());
        let response = match err {
            Error::Publish { failures, .. } if failures.len() > 1 => response.with_details(failures),
            _ => response,
        };

        Self { status, response }
    }
}
