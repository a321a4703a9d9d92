//! Initial load and catalog statistics.

use axum::{extract::State, http::StatusCode, Json};
use std::time::Instant;
use tracing::info;

use catalog_service::{CatalogStats, LoadSummary};

use crate::response::{AcceptedResponse, ApiError};
use crate::state::AppState;

/// POST /initial-load - Queue every FIPE brand of every vehicle type.
///
/// Returns once the brands are on the queue; models are fetched by the
/// worker afterwards.
pub async fn initial_load_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AcceptedResponse<LoadSummary>>), ApiError> {
    let start = Instant::now();
    let summary = state.catalog.initial_load().await?;

    info!(
        published = summary.total_published,
        latency_ms = start.elapsed().as_millis() as u64,
        "Initial load queued"
    );

    let message = format!("{} brands queued for processing", summary.total_published);
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new(message, summary)),
    ))
}

/// GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CatalogStats>, ApiError> {
    Ok(Json(state.catalog.stats().await?))
}
