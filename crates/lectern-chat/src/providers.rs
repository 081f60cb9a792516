//! Provider streaming over SSE.
//!
//! Every provider is one POST whose response is a `text/event-stream`. The
//! request body and the meaning of each `data:` payload differ; the read
//! loop is shared. OpenAI and Groq speak the same chat-completions format.

use std::pin::Pin;

use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::{ChatMessage, LLMProvider, ProviderTarget};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub temperature: f64,
    pub max_tokens: usize,
}

/// Meaning of one SSE `data:` payload.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Text(Vec<String>),
    End,
    Failed(String),
    Ignore,
}

type Decoder = fn(&str) -> Frame;

/// Stream tokens from the target's provider.
pub fn stream_llm(
    client: &Client,
    target: &ProviderTarget,
    messages: Vec<ChatMessage>,
    sampling: Sampling,
) -> BoxedStream {
    let base = target.base_url.trim_end_matches('/');
    let (request, decode): (RequestBuilder, Decoder) = match target.provider {
        LLMProvider::OpenAI | LLMProvider::Groq => (
            client
                .post(format!("{}/chat/completions", base))
                .bearer_auth(&target.api_key)
                .json(&openai_body(&target.model, &messages, sampling)),
            decode_openai,
        ),
        LLMProvider::Anthropic => (
            client
                .post(format!("{}/messages", base))
                .header("x-api-key", &target.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&anthropic_body(&target.model, &messages, sampling)),
            decode_anthropic,
        ),
        LLMProvider::Gemini => (
            client
                .post(format!(
                    "{}/models/{}:streamGenerateContent?alt=sse",
                    base, target.model
                ))
                .header("x-goog-api-key", &target.api_key)
                .json(&gemini_body(&messages, sampling)),
            decode_gemini,
        ),
    };
    debug!("Streaming from {} model {}", target.provider, target.model);
    sse_stream(request, target.provider, decode)
}

/// Pull system messages out for providers that take them as a separate
/// field. Several are joined in order.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    let rest = messages.iter().filter(|m| m.role != "system").collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, rest)
}

fn openai_body(model: &str, messages: &[ChatMessage], sampling: Sampling) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": sampling.temperature,
        "max_tokens": sampling.max_tokens,
        "stream": true,
    })
}

fn anthropic_body(model: &str, messages: &[ChatMessage], sampling: Sampling) -> Value {
    let (system, conversation) = split_system(messages);
    let mut body = json!({
        "model": model,
        "messages": conversation,
        "temperature": sampling.temperature,
        "max_tokens": sampling.max_tokens,
        "stream": true,
    });
    if let Some(system) = system {
        body["system"] = json!(system);
    }
    body
}

fn gemini_body(messages: &[ChatMessage], sampling: Sampling) -> Value {
    let (system, conversation) = split_system(messages);
    let contents: Vec<Value> = conversation
        .iter()
        .map(|m| {
            let role = if m.role == "assistant" { "model" } else { "user" };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();
    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "temperature": sampling.temperature,
            "maxOutputTokens": sampling.max_tokens,
        },
    });
    if let Some(system) = system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

fn text_frame<'a>(texts: impl IntoIterator<Item = &'a str>) -> Frame {
    let texts: Vec<String> = texts
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if texts.is_empty() {
        Frame::Ignore
    } else {
        Frame::Text(texts)
    }
}

fn decode_openai(data: &str) -> Frame {
    if data == "[DONE]" {
        return Frame::End;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Frame::Ignore;
    };
    if let Some(msg) = parsed["error"]["message"].as_str() {
        return Frame::Failed(msg.to_string());
    }
    text_frame(parsed["choices"][0]["delta"]["content"].as_str())
}

fn decode_anthropic(data: &str) -> Frame {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Frame::Ignore;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => text_frame(parsed["delta"]["text"].as_str()),
        Some("message_stop") => Frame::End,
        Some("error") => Frame::Failed(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        _ => Frame::Ignore,
    }
}

fn decode_gemini(data: &str) -> Frame {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Frame::Ignore;
    };
    if let Some(msg) = parsed["error"]["message"].as_str() {
        return Frame::Failed(msg.to_string());
    }
    let parts = parsed["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect::<Vec<_>>())
        .unwrap_or_default();
    text_frame(parts)
}

fn request_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else {
        format!("Request failed: {}", e)
    }
}

/// Remove every complete line from `buffer`, returning the non-empty,
/// non-comment ones.
fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line_end) = buffer.find('\n') {
        let line = buffer[..line_end].trim().to_string();
        buffer.drain(..=line_end);
        if !line.is_empty() && !line.starts_with(':') {
            lines.push(line);
        }
    }
    lines
}

/// Send `request` and turn its event stream into chunks via `decode`.
///
/// Always ends with exactly one `Done` or `Error`. A body that closes
/// without an explicit end frame counts as done.
fn sse_stream(request: RequestBuilder, provider: LLMProvider, decode: Decoder) -> BoxedStream {
    Box::pin(async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(request_error(e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut bytes_stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut tokens_used = 0usize;

        while let Some(next) = bytes_stream.next().await {
            match next {
                Ok(bytes) => buffer.push_str(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            }

            // "event:" lines carry nothing the "data:" payload lacks
            for line in drain_lines(&mut buffer) {
                let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                    continue;
                };
                match decode(data) {
                    Frame::Text(texts) => {
                        for text in texts {
                            tokens_used += 1;
                            yield StreamChunk::Token(text);
                        }
                    }
                    Frame::End => {
                        yield StreamChunk::Done { tokens_used };
                        return;
                    }
                    Frame::Failed(msg) => {
                        error!("{} error: {}", provider, msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    Frame::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used };
    })
}
