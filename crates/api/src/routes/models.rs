//! Model endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use catalog_core::{Model, ModelUpdate};

use crate::extractors::JsonBody;
use crate::response::ApiError;
use crate::state::AppState;

/// GET /models/:code
pub async fn get_model_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Model>, ApiError> {
    Ok(Json(state.queries.get_model(&code).await?))
}

/// PUT /models/:code - Change a model's name and/or observations.
///
/// A blank `nome` keeps the current name.
pub async fn update_model_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    JsonBody(update): JsonBody<ModelUpdate>,
) -> Result<Json<Model>, ApiError> {
    Ok(Json(state.queries.update_model(&code, update).await?))
}
