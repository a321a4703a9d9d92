//! Brand endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use catalog_core::{Brand, CreateBrand, Model, Page};

use crate::extractors::{JsonBody, ListParams};
use crate::response::ApiError;
use crate::state::AppState;

/// GET /brands - Brands ordered by name, optionally filtered by vehicle type.
pub async fn list_brands_handler(
    State(state): State<AppState>,
    params: ListParams,
) -> Result<Json<Page<Brand>>, ApiError> {
    debug!(vehicle_type = ?params.vehicle_type, page = params.page.page, size = params.page.size, "List brands");
    let page = state
        .queries
        .list_brands(params.vehicle_type.as_deref(), params.page)
        .await?;
    Ok(Json(page))
}

/// POST /brands - Register a brand and queue it for model ingestion.
pub async fn create_brand_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBrand>,
) -> Result<(StatusCode, Json<Brand>), ApiError> {
    let brand = state.catalog.create_brand(request).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// GET /brands/:code
pub async fn get_brand_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Brand>, ApiError> {
    Ok(Json(state.queries.get_brand(&code).await?))
}

/// GET /brands/:code/models - Models of one brand ordered by name.
pub async fn list_models_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    params: ListParams,
) -> Result<Json<Page<Model>>, ApiError> {
    let page = state.queries.list_models_by_brand(&code, params.page).await?;
    Ok(Json(page))
}
