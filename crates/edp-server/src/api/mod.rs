pub mod response;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use edp_cache::DataCache;
use std::sync::Arc;

/// Shared state for the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<DataCache>,
}

/// Build the `/api/v1` router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/data", get(routes::get_data))
        .route("/loading-status", get(routes::loading_status))
        .route("/invalidate", post(routes::invalidate))
        .with_state(state)
}
