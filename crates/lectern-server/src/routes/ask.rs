//! Question answering routes, plain and streamed.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;

use lectern_chat::StreamChunk;
use lectern_core::Error;
use lectern_resolve::{ContextSource, QueryResult, QueryStatus, StreamEvent};
use lectern_runtime::PreparedAnswer;

use super::{bad_request, ApiError};
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ask", post(ask))
        .route("/ask/stream", post(ask_stream))
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// POST /api/ask: answer one question.
///
/// Rejections and failures are still 200; `status` tells them apart.
async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question is required"));
    }
    Ok(Json(state.assistant.ask(question).await))
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|e| Event::default().data(format!("{{\"type\":\"error\",\"error\":\"{}\"}}", e)))
}

/// POST /api/ask/stream: the same flow as SSE `StreamEvent`s.
///
/// Order: `context` (only when chunks were retrieved), `token`*, an
/// optional `error`, then `done`.
async fn ask_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Sse<SseStream>, ApiError> {
    let question = req.question.trim().to_string();
    if question.is_empty() {
        return Err(bad_request("question is required"));
    }

    let start = Instant::now();
    let prepared = state.assistant.prepare_stream(&question).await;

    let sse_stream: SseStream = Box::pin(async_stream::stream! {
        match prepared {
            PreparedAnswer::Finished(result) => {
                yield Ok::<_, Infallible>(sse_event(&StreamEvent::Token {
                    content: result.answer_text.clone(),
                }));
                if result.status == QueryStatus::Error {
                    yield Ok(sse_event(&StreamEvent::Error { error: result.answer_text }));
                }
                yield Ok(sse_event(&StreamEvent::Done {
                    status: result.status,
                    tokens_used: 0,
                    duration: start.elapsed().as_millis() as u64,
                }));
            }
            PreparedAnswer::Streaming { chunks, mut stream } => {
                yield Ok(sse_event(&StreamEvent::Context {
                    sources: ContextSource::from_chunks(&chunks),
                }));

                let mut answer = String::new();
                let mut tokens_used = 0;
                let mut failure = None;
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        StreamChunk::Token(text) => {
                            answer.push_str(&text);
                            yield Ok(sse_event(&StreamEvent::Token { content: text }));
                        }
                        StreamChunk::Done { tokens_used: t } => {
                            tokens_used = t;
                            break;
                        }
                        StreamChunk::Error(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }

                let outcome = match failure {
                    Some(e) => Err(Error::Transport(e)),
                    None => Ok(answer),
                };
                let result = state.assistant.finish_stream(&question, chunks, outcome);
                if result.status == QueryStatus::Error {
                    yield Ok(sse_event(&StreamEvent::Error { error: result.answer_text }));
                }
                yield Ok(sse_event(&StreamEvent::Done {
                    status: result.status,
                    tokens_used,
                    duration: start.elapsed().as_millis() as u64,
                }));
            }
        }
    });

    Ok(Sse::new(sse_stream))
}
