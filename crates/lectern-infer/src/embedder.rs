//! Embedding trait and hosted implementations.
//!
//! - `GeminiEmbedder`: `text-embedding-004`, 768-dim, `batchEmbedContents`
//! - `OpenAiEmbedder`: `text-embedding-3-small`, 1536-dim, `/embeddings`
//!
//! Every failure (network, timeout, non-2xx, malformed body) is
//! `Error::Transport`.

use std::time::Duration;

use async_trait::async_trait;
use lectern_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const GEMINI_EMBEDDING_DIM: usize = 768;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const OPENAI_EMBEDDING_DIM: usize = 1536;

/// Gemini accepts at most 100 requests per batch call.
const GEMINI_MAX_BATCH: usize = 100;
const EMBED_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts; the result is index-aligned with `texts`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    /// Model identifier, for logs and status output.
    fn model_name(&self) -> &str;
}

pub(crate) fn embed_client() -> Result<Client> {
    Client::builder()
        .timeout(EMBED_TIMEOUT)
        .build()
        .map_err(|e| Error::Http(e.to_string()))
}

fn transport_error(provider: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Transport(format!("{} embedding request timed out", provider))
    } else {
        Error::Transport(format!("{} embedding request failed: {}", provider, e))
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Transport(format!(
            "{} embedding API error ({}): {}",
            provider, status, body
        )));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Transport(format!("{} embedding response malformed: {}", provider, e)))
}

// ── Gemini ──────────────────────────────────────────────────

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiEmbedRequest<'a> {
    model: &'a str,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiValues,
}

#[derive(Deserialize)]
struct GeminiBatchResponse {
    #[serde(default)]
    embeddings: Vec<GeminiValues>,
}

/// Google Gemini embeddings.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    /// Fully qualified model name, e.g. `models/text-embedding-004`.
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: embed_client()?,
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            model: format!("models/{}", GEMINI_EMBEDDING_MODEL),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{}", self.base_url.trim_end_matches('/'), self.model, method)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = GeminiEmbedRequest {
            model: &self.model,
            content: GeminiContent {
                parts: [GeminiPart { text }],
            },
        };
        let response = self
            .client
            .post(self.endpoint("embedContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;
        let parsed: GeminiEmbedResponse = read_json("Gemini", response).await?;
        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(GEMINI_MAX_BATCH) {
            let request = GeminiBatchRequest {
                requests: batch
                    .iter()
                    .map(|text| GeminiEmbedRequest {
                        model: &self.model,
                        content: GeminiContent {
                            parts: [GeminiPart { text }],
                        },
                    })
                    .collect(),
            };
            let response = self
                .client
                .post(self.endpoint("batchEmbedContents"))
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error("Gemini", e))?;
            let parsed: GeminiBatchResponse = read_json("Gemini", response).await?;
            debug!("Gemini embedded batch of {}", parsed.embeddings.len());
            out.extend(parsed.embeddings.into_iter().map(|e| e.values));
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        GEMINI_EMBEDDING_DIM
    }

    fn model_name(&self) -> &str {
        GEMINI_EMBEDDING_MODEL
    }
}

// ── OpenAI ──────────────────────────────────────────────────

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiItem>,
}

#[derive(Deserialize)]
struct OpenAiItem {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: embed_client()?,
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("OpenAI returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&OpenAiRequest {
                model: OPENAI_EMBEDDING_MODEL,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| transport_error("OpenAI", e))?;
        let mut parsed: OpenAiResponse = read_json("OpenAI", response).await?;
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimension(&self) -> usize {
        OPENAI_EMBEDDING_DIM
    }

    fn model_name(&self) -> &str {
        OPENAI_EMBEDDING_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_gemini_batch_request_shape() {
        let app = Router::new().route(
            "/models/text-embedding-004:batchEmbedContents",
            post(|Json(body): Json<Value>| async move {
                let requests = body["requests"].as_array().cloned().unwrap_or_default();
                let embeddings: Vec<Value> = requests
                    .iter()
                    .map(|r| {
                        let len = r["content"]["parts"][0]["text"].as_str().unwrap().len();
                        json!({ "values": [len as f32, 1.0] })
                    })
                    .collect();
                Json(json!({ "embeddings": embeddings }))
            }),
        );
        let base = serve(app).await;
        let embedder = GeminiEmbedder::new("key").unwrap().with_base_url(base);

        let vectors = embedder
            .embed_batch(&["ab".to_string(), "abcd".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![2.0, 1.0], vec![4.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_openai_orders_by_index() {
        let app = Router::new().route(
            "/embeddings",
            post(|| async {
                Json(json!({ "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]}))
            }),
        );
        let base = serve(app).await;
        let embedder = OpenAiEmbedder::new("key").unwrap().with_base_url(base);

        let vectors = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_api_error_is_transport() {
        let app = Router::new().route(
            "/embeddings",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;
        let embedder = OpenAiEmbedder::new("key").unwrap().with_base_url(base);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m.contains("429")));
    }
}
