//! History listing.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use lectern_store::QUERY_RESULTS_COLLECTION;

use super::{error_response, ApiError};
use crate::state::AppState;

const MAX_LIMIT: usize = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/history", get(list_history))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    collection: Option<String>,
    limit: Option<usize>,
}

/// GET /api/history?collection=&limit=: newest records first.
async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(history) = &state.history else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "history is disabled" })),
        ));
    };

    let collection = query
        .collection
        .as_deref()
        .unwrap_or(QUERY_RESULTS_COLLECTION);
    let limit = query.limit.unwrap_or(20).min(MAX_LIMIT);

    let records = history
        .list(collection, limit)
        .map_err(|e| error_response(&e))?;
    let total = history
        .count(Some(collection))
        .map_err(|e| error_response(&e))?;

    Ok(Json(json!({
        "collection": collection,
        "records": records,
        "total": total,
    })))
}
