//! EDP Server
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Thin HTTP read facade over the in-memory dataset cache. The server owns
//! exactly one [`DataCache`] and exposes it as JSON endpoints:
//!
//! - `GET /health`: liveness plus whether the dataset is materialized
//! - `GET /api/v1/data`: the collection, optionally paginated
//! - `GET /api/v1/loading-status`: live load telemetry
//! - `POST /api/v1/invalidate`: drop the materialized collection

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;

use axum::{extract::State, routing::get, Json, Router};
use edp_cache::DataCache;
use serde_json::json;
use std::sync::Arc;

use config::Config;

/// Build the application router with all routes and middleware
pub fn app(cache: Arc<DataCache>, config: &Config) -> Router {
    let api_state = api::ApiState {
        cache: Arc::clone(&cache),
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(cache)
        .nest("/api/v1", api::router(api_state))
        // Apply layers from innermost to outermost
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(cache): State<Arc<DataCache>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "cache_loaded": cache.is_loaded()
    }))
}
