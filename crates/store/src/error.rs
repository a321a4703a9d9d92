//! sqlx error mapping.

use sqlx::Error as SqlxError;
use tracing::error;

use catalog_core::Error;
use telemetry::metrics;

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

/// Unique violations become `DuplicateKey`; everything else is a database error.
pub fn map_write_error(error: SqlxError, what: &str) -> Error {
    if is_unique_violation(&error) {
        return Error::duplicate(what.to_string());
    }
    map_db_error(error, what)
}

pub fn map_db_error(error: SqlxError, what: &str) -> Error {
    metrics().db_errors.inc();
    error!(operation = what, error = %error, "Database error");
    Error::database(format!("{}: {}", what, error))
}
