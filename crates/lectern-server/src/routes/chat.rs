//! Free-form chat route: a role-tagged conversation in, the next reply out.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lectern_chat::ChatMessage;

use super::{bad_request, error_response, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    /// Sent as a leading system message when given.
    #[serde(default)]
    persona: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    reply: String,
    model: String,
}

/// The conversation must end with a user turn and use known roles.
fn validate(messages: &[ChatMessage]) -> Result<(), &'static str> {
    if messages
        .iter()
        .any(|m| !matches!(m.role.as_str(), "system" | "user" | "assistant"))
    {
        return Err("roles must be system, user or assistant");
    }
    match messages.last() {
        Some(last) if last.role == "user" && !last.content.trim().is_empty() => Ok(()),
        _ => Err("conversation must end with a non-empty user message"),
    }
}

/// POST /api/chat: answer the last user turn in context, without the corpus.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    validate(&req.messages).map_err(bad_request)?;

    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    if let Some(persona) = req.persona.filter(|p| !p.trim().is_empty()) {
        messages.push(ChatMessage::system(persona));
    }
    messages.extend(req.messages);

    let reply = state
        .llm
        .invoke_messages(&messages)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(ChatReply {
        reply,
        model: state.llm.model_name(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_must_end_with_user_turn() {
        assert!(validate(&[]).is_err());
        assert!(validate(&[ChatMessage::user("Hi"), ChatMessage::assistant("Hello")]).is_err());
        assert!(validate(&[ChatMessage::user("  ")]).is_err());
        assert!(validate(&[
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello"),
            ChatMessage::user("Bye"),
        ])
        .is_ok());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let narrator = ChatMessage {
            role: "narrator".into(),
            content: "Once upon a time".into(),
        };
        assert!(validate(&[narrator, ChatMessage::user("Go on")]).is_err());
    }
}
