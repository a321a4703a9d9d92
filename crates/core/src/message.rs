//! Queue payload for brand processing requests.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::model::VehicleType;

/// Rejects empty or whitespace-only strings.
pub fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts carros, motos or caminhoes in any case.
pub fn validate_vehicle_type(value: &str) -> std::result::Result<(), ValidationError> {
    validate_not_blank(value)?;
    if value.parse::<VehicleType>().is_err() {
        let mut err = ValidationError::new("vehicle_type");
        err.message = Some(format!("'{}' is not one of carros, motos, caminhoes", value).into());
        return Err(err);
    }
    Ok(())
}

/// A request to ingest one brand and its models.
///
/// Delivered at-least-once; consumers must be idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BrandMessage {
    #[validate(length(max = 32), custom(function = "validate_not_blank"))]
    pub codigo_marca: String,
    #[validate(length(max = 255), custom(function = "validate_not_blank"))]
    pub nome_marca: String,
    #[validate(custom(function = "validate_vehicle_type"))]
    pub tipo_veiculo: String,
    /// Creation instant, epoch milliseconds.
    pub timestamp: i64,
}

impl BrandMessage {
    /// Build a validated message stamped with the current time.
    pub fn new(codigo_marca: &str, nome_marca: &str, tipo_veiculo: &str) -> Result<Self> {
        let msg = Self {
            codigo_marca: codigo_marca.trim().to_string(),
            nome_marca: nome_marca.trim().to_string(),
            tipo_veiculo: tipo_veiculo.trim().to_ascii_lowercase(),
            timestamp: Utc::now().timestamp_millis(),
        };
        msg.check()?;
        Ok(msg)
    }

    /// Validate fields and return the parsed vehicle type.
    pub fn check(&self) -> Result<VehicleType> {
        self.validate()
            .map_err(|e| Error::validation(format!("brand message: {}", e)))?;
        self.tipo_veiculo.parse()
    }

    /// Decode a raw queue payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
