//! HTTP handlers over the dataset cache

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use edp_cache::ExportRecord;
use serde::Deserialize;
use serde_json::json;

use super::response::PaginationMeta;
use super::ApiState;
use crate::error::{ApiResult, AppError};

/// Query parameters for the collection endpoint.
///
/// Non-numeric values are rejected by the extractor before the handler
/// runs, which already yields a 400.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /data
///
/// With no query parameters the whole collection is returned as a raw
/// JSON array. When `offset` or `limit` is present the response switches
/// to an envelope carrying the slice and its pagination metadata.
pub async fn get_data(
    State(state): State<ApiState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Response> {
    let data = state.cache.get_data().await?;

    if params.offset.is_none() && params.limit.is_none() {
        return Ok(Json(data.as_ref()).into_response());
    }

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(data.len() as i64);
    if offset < 0 || limit < 0 {
        return Err(AppError::BadRequest(
            "offset and limit must be non-negative integers".to_string(),
        ));
    }

    let (offset, limit) = (offset as usize, limit as usize);
    let page: Vec<&ExportRecord> = data.iter().skip(offset).take(limit).collect();
    let meta = PaginationMeta::new(data.len(), offset, limit, page.len());

    Ok(Json(json!({
        "data": page,
        "pagination": meta,
    }))
    .into_response())
}

/// GET /loading-status
///
/// Snapshot of the current load telemetry. Never blocks on an active load.
pub async fn loading_status(State(state): State<ApiState>) -> Response {
    Json(state.cache.loading_status()).into_response()
}

/// POST /invalidate
///
/// Drops the materialized collection so the next read reloads from source.
pub async fn invalidate(State(state): State<ApiState>) -> Response {
    state.cache.invalidate();
    tracing::info!("cache invalidated via API");
    Json(json!({ "success": true })).into_response()
}
