//! Logical cache keys.

use std::fmt;

use catalog_core::{PageRequest, VehicleType};

const ENTITY_ID: &str = "entity";

pub const STATS_BRANDS: &str = "brands";
pub const STATS_MODELS: &str = "models";
pub const STATS_CATALOG: &str = "catalog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Brand,
    Model,
    BrandList,
    ModelList,
    Stats,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Model => "model",
            Self::BrandList => "brands",
            Self::ModelList => "models",
            Self::Stats => "stats",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind, scope and id of a cached value. The physical key adds the
/// current namespace versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub scope: String,
    pub id: String,
}

impl CacheKey {
    pub fn new(kind: CacheKind, scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            id: id.into(),
        }
    }

    /// A single brand, scoped by its code so it can be orphaned on its own.
    pub fn brand(code: &str) -> Self {
        Self::new(CacheKind::Brand, code, ENTITY_ID)
    }

    pub fn model(code: &str) -> Self {
        Self::new(CacheKind::Model, code, ENTITY_ID)
    }

    pub fn brand_list(vehicle_type: Option<VehicleType>, page: PageRequest) -> Self {
        let scope = vehicle_type.map(|vt| vt.as_str()).unwrap_or("all");
        Self::new(CacheKind::BrandList, scope, page_id(page))
    }

    /// A page of one brand's models, scoped by the brand code.
    pub fn model_list(brand_code: &str, page: PageRequest) -> Self {
        Self::new(CacheKind::ModelList, brand_code, page_id(page))
    }

    pub fn brand_count(vehicle_type: Option<VehicleType>) -> Self {
        let id = vehicle_type.map(|vt| vt.as_str()).unwrap_or("all");
        Self::new(CacheKind::Stats, STATS_BRANDS, id)
    }

    pub fn model_count(brand_code: Option<&str>) -> Self {
        Self::new(CacheKind::Stats, STATS_MODELS, brand_code.unwrap_or("all"))
    }

    pub fn catalog_stats() -> Self {
        Self::new(CacheKind::Stats, STATS_CATALOG, "summary")
    }
}

fn page_id(page: PageRequest) -> String {
    format!("p{}:s{}", page.page, page.size)
}

/// Backend key holding a kind's namespace version.
pub(crate) fn kind_version_key(kind: CacheKind) -> String {
    format!("ns:{}", kind)
}

/// Backend key holding a scope's namespace version.
pub(crate) fn scope_version_key(kind: CacheKind, scope: &str) -> String {
    format!("ns:{}:{}", kind, scope)
}

pub(crate) fn physical_key(key: &CacheKey, kind_version: u64, scope_version: u64) -> String {
    format!(
        "{}:v{}:{}:v{}:{}",
        key.kind, kind_version, key.scope, scope_version, key.id
    )
}
