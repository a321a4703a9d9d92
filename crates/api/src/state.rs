//! Application state shared across handlers.

use catalog_service::{CatalogService, QueryService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Cached catalog reads and model edits
    pub queries: QueryService,
    /// Brand creation, initial load and stats
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(queries: QueryService, catalog: CatalogService) -> Self {
        Self { queries, catalog }
    }
}
