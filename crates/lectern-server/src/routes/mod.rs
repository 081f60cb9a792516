//! HTTP route handlers.

pub mod ask;
pub mod chat;
pub mod corpus;
pub mod history;
pub mod news;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use axum::Router;
use lectern_core::Error;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(ask::routes())
        .merge(chat::routes())
        .merge(history::routes())
        .merge(news::routes())
        .merge(corpus::routes())
}

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// Map a library error onto a JSON error response.
pub(crate) fn error_response(err: &Error) -> ApiError {
    let status = match err {
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Transport(_) | Error::Parse { .. } | Error::Load(_) => StatusCode::BAD_GATEWAY,
        Error::Index(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut body = json!({ "error": err.to_string() });
    if let Some(raw) = err.raw_output() {
        body["raw"] = Value::String(raw.to_string());
    }
    (status, Json(body))
}

pub(crate) fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_response_carries_raw_text() {
        let (status, Json(body)) = error_response(&Error::Parse {
            message: "expected value".into(),
            raw: "not json".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["raw"], "not json");
    }

    #[test]
    fn test_config_error_is_unavailable() {
        let (status, Json(body)) = error_response(&Error::Config("NEWS_API_KEY is not set".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("raw").is_none());
    }
}
