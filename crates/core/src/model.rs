//! Catalog domain types: vehicle types, brands, models and pagination.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::message::{validate_not_blank, validate_vehicle_type};

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// FIPE vehicle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum VehicleType {
    Carros,
    Motos,
    Caminhoes,
}

impl VehicleType {
    pub const ALL: [VehicleType; 3] = [Self::Carros, Self::Motos, Self::Caminhoes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Carros => "carros",
            Self::Motos => "motos",
            Self::Caminhoes => "caminhoes",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carros" => Ok(Self::Carros),
            "motos" => Ok(Self::Motos),
            "caminhoes" => Ok(Self::Caminhoes),
            other => Err(Error::validation(format!(
                "invalid vehicle type '{}': expected carros, motos or caminhoes",
                other
            ))),
        }
    }
}

impl TryFrom<String> for VehicleType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Brand as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub codigo_fipe: String,
    pub nome: String,
    pub tipo_veiculo: VehicleType,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: DateTime<Utc>,
}

/// Model as stored in the catalog, with its owning brand denormalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub codigo_fipe: String,
    pub nome: String,
    pub observacoes: Option<String>,
    pub brand_id: i64,
    pub codigo_marca: String,
    pub nome_marca: String,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: DateTime<Utc>,
}

/// Brand to insert.
#[derive(Debug, Clone)]
pub struct NewBrand {
    pub codigo_fipe: String,
    pub nome: String,
    pub tipo_veiculo: VehicleType,
}

/// Model to insert under an existing brand.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub codigo_fipe: String,
    pub nome: String,
    pub brand_id: i64,
}

/// Partial update of a model. Blank names are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ModelUpdate {
    #[validate(length(max = 255))]
    pub nome: Option<String>,
    pub observacoes: Option<String>,
}

impl ModelUpdate {
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("model update: {}", e)))
    }

    /// The new name, if one was supplied and is not blank.
    pub fn nome(&self) -> Option<&str> {
        self.nome
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Manual brand registration request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrand {
    #[validate(length(max = 32), custom(function = "validate_not_blank"))]
    pub codigo: String,
    #[validate(length(max = 255), custom(function = "validate_not_blank"))]
    pub nome: String,
    #[validate(custom(function = "validate_vehicle_type"))]
    pub tipo_veiculo: String,
}

impl CreateBrand {
    /// Validate and normalize into an insertable brand.
    pub fn into_new_brand(self) -> Result<NewBrand> {
        self.validate()
            .map_err(|e| Error::validation(format!("brand: {}", e)))?;
        Ok(NewBrand {
            codigo_fipe: self.codigo.trim().to_string(),
            nome: self.nome.trim().to_string(),
            tipo_veiculo: self.tipo_veiculo.parse()?,
        })
    }
}

/// Brand reference as returned by the FIPE API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRef {
    #[serde(deserialize_with = "string_or_number")]
    pub codigo: String,
    pub nome: String,
}

/// Model reference as returned by the FIPE API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(deserialize_with = "string_or_number")]
    pub codigo: String,
    pub nome: String,
}

// FIPE sends brand codes as strings but model codes as integers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Int(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Int(n) => n.to_string(),
    })
}

/// Zero-based page request, size clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let size = request.size.max(1) as u64;
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
            total_pages: total.div_ceil(size),
        }
    }
}
