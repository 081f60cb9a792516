//! Corpus rebuild route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use lectern_runtime::BuildReport;

use super::{error_response, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/corpus/rebuild", post(rebuild))
}

/// POST /api/corpus/rebuild: reload every source and replace the index.
///
/// Only one rebuild runs at a time; a concurrent request gets 409.
async fn rebuild(State(state): State<Arc<AppState>>) -> Result<Json<BuildReport>, ApiError> {
    let Ok(_guard) = state.rebuild_lock.try_lock() else {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "a rebuild is already running" })),
        ));
    };

    info!("Corpus rebuild requested");
    state
        .assistant
        .build_corpus()
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}
