//! News analysis route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use lectern_runtime::NewsReport;

use super::{bad_request, error_response, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/news/analyze", post(analyze))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    query: String,
}

/// POST /api/news/analyze: fetch, analyse and store the latest news.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<NewsReport>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request("query is required"));
    }
    let Some(analyst) = &state.news else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "news analysis needs NEWS_API_KEY" })),
        ));
    };

    analyst
        .analyze(query)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}
