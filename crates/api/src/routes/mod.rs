//! API routes.

pub mod brands;
pub mod health;
pub mod load;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/initial-load", post(load::initial_load_handler))
        .route("/stats", get(load::stats_handler))
        .route(
            "/brands",
            get(brands::list_brands_handler).post(brands::create_brand_handler),
        )
        .route("/brands/:code", get(brands::get_brand_handler))
        .route("/brands/:code/models", get(brands::list_models_handler))
        .route(
            "/models/:code",
            get(models::get_model_handler).put(models::update_model_handler),
        )
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(health::metrics_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
