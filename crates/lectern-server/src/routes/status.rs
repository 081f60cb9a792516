//! Status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

/// GET /api/status: index, model and history summary.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.assistant.status();
    Json(json!({
        "ready": status.ready,
        "index": status.index,
        "llmModel": status.llm_model,
        "llm": state.llm_config.to_response(),
        "gateKeywords": status.gate_keywords,
        "topK": status.top_k,
        "historyRecords": status.history_records,
        "newsAvailable": state.news.is_some(),
        "sources": state.config.sources.len(),
    }))
}
