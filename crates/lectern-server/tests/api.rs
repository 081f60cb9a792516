//! HTTP API tests against a loopback server with stub model and embedder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};
use tempfile::TempDir;

use lectern_chat::{BoxedStream, LLMConfig, LanguageModel, StreamChunk};
use lectern_core::{LecternConfig, Result, SourceKind, SourceSpec};
use lectern_infer::Embedder;
use lectern_server::{routes, AppState};
use lectern_store::HistoryStore;

/// Bag-of-keywords embedding over a small fixed vocabulary.
struct VocabEmbedder;

const VOCAB: &[&str] = &["fee", "library", "campus", "faculty"];

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(VOCAB
            .iter()
            .map(|w| if text.contains(w) { 1.0 } else { 0.05 })
            .collect())
    }

    fn dimension(&self) -> usize {
        VOCAB.len()
    }

    fn model_name(&self) -> &str {
        "vocab"
    }
}

struct EchoModel {
    fragments: Vec<&'static str>,
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for EchoModel {
    fn stream(&self, _prompt: &str) -> BoxedStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut chunks: Vec<StreamChunk> = self
            .fragments
            .iter()
            .map(|f| StreamChunk::Token(f.to_string()))
            .collect();
        chunks.push(StreamChunk::Done {
            tokens_used: self.fragments.len(),
        });
        Box::pin(stream::iter(chunks))
    }

    fn model_name(&self) -> String {
        "echo/test".into()
    }
}

struct Harness {
    _dir: TempDir,
    base: String,
    client: reqwest::Client,
    model: Arc<EchoModel>,
}

async fn start() -> Harness {
    let dir = TempDir::new().unwrap();
    let fees = dir.path().join("fees.txt");
    std::fs::write(&fees, "Undergraduate tuition fees are 50,000 FCFA per year.").unwrap();
    let library = dir.path().join("library.md");
    std::fs::write(&library, "# Library\nThe central library opens at 8am on weekdays.").unwrap();

    let mut config = LecternConfig::with_data_dir(dir.path().join("data")).unwrap();
    config.sources = vec![
        SourceSpec::new(SourceKind::File, fees.to_string_lossy()),
        SourceSpec::new(SourceKind::File, library.to_string_lossy()),
    ];

    let history = Arc::new(HistoryStore::open(&config.data_paths.history_dir).unwrap());
    let model = Arc::new(EchoModel {
        fragments: vec!["Fees are ", "50,000 FCFA [Source 1]."],
        calls: AtomicUsize::new(0),
    });
    let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
    let state = Arc::new(
        AppState::from_parts(
            config,
            llm_config,
            Arc::new(VocabEmbedder),
            model.clone(),
            Some(history),
            None,
        )
        .unwrap(),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        _dir: dir,
        base: format!("http://{}/api", addr),
        client: reqwest::Client::new(),
        model,
    }
}

impl Harness {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> Value {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn rebuild(&self) -> Value {
        let resp = self.post("/corpus/rebuild", json!({})).await;
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_status_before_and_after_rebuild() {
    let h = start().await;

    let status = h.get("/status").await;
    assert_eq!(status["ready"], false);
    assert_eq!(status["llmModel"], "echo/test");
    assert_eq!(status["newsAvailable"], false);
    assert_eq!(status["sources"], 2);

    let report = h.rebuild().await;
    assert_eq!(report["documents"], 2);
    assert!(report["warnings"].as_array().unwrap().is_empty());

    let status = h.get("/status").await;
    assert_eq!(status["ready"], true);
    assert_eq!(status["index"]["dimension"], 4);
    assert_eq!(status["index"]["embedding_model"], "vocab");
}

#[tokio::test]
async fn test_ask_answers_and_records_history() {
    let h = start().await;
    h.rebuild().await;

    let resp = h
        .post("/ask", json!({ "question": "What are the tuition fees?" }))
        .await;
    assert_eq!(resp.status(), 200);
    let result: Value = resp.json().await.unwrap();
    assert_eq!(result["status"], "answered");
    assert_eq!(result["answer_text"], "Fees are 50,000 FCFA [Source 1].");
    assert!(result["retrieved_chunks"][0]["text"]
        .as_str()
        .unwrap()
        .contains("tuition"));

    let history = h.get("/history?limit=5").await;
    assert_eq!(history["collection"], "query_results");
    assert_eq!(history["total"], 1);
    let record = &history["records"][0];
    assert_eq!(record["payload"]["question"], "What are the tuition fees?");
    assert_eq!(record["payload"]["status"], "answered");
}

#[tokio::test]
async fn test_off_topic_question_is_rejected() {
    let h = start().await;
    h.rebuild().await;

    let result: Value = h
        .post("/ask", json!({ "question": "Who won the match in Madrid?" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["status"], "rejected_off_topic");
    assert_eq!(result["admitted"], false);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_question_is_bad_request() {
    let h = start().await;
    let resp = h.post("/ask", json!({ "question": "   " })).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_ask_before_rebuild_reports_error_status() {
    let h = start().await;
    let result: Value = h
        .post("/ask", json!({ "question": "Where is the library?" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["status"], "error");
}

#[tokio::test]
async fn test_stream_emits_context_tokens_and_done() {
    let h = start().await;
    h.rebuild().await;

    let resp = h
        .post("/ask/stream", json!({ "question": "When does the library open?" }))
        .await;
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();

    let events: Vec<Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    assert_eq!(events.first().unwrap()["type"], "context");
    assert_eq!(events[0]["sources"][0]["label"], 1);
    let tokens: String = events
        .iter()
        .filter(|e| e["type"] == "token")
        .map(|e| e["content"].as_str().unwrap())
        .collect();
    assert_eq!(tokens, "Fees are 50,000 FCFA [Source 1].");
    let done = events.last().unwrap();
    assert_eq!(done["type"], "done");
    assert_eq!(done["status"], "answered");
    assert_eq!(done["tokensUsed"], 2);

    let history = h.get("/history").await;
    assert_eq!(history["total"], 1);
}

#[tokio::test]
async fn test_stream_rejection_has_no_context_event() {
    let h = start().await;
    h.rebuild().await;

    let body = h
        .post("/ask/stream", json!({ "question": "Best beaches in Kribi?" }))
        .await
        .text()
        .await
        .unwrap();
    assert!(!body.contains("\"type\":\"context\""));
    assert!(body.contains("\"status\":\"rejected_off_topic\""));
}

#[tokio::test]
async fn test_news_without_key_is_unavailable() {
    let h = start().await;
    let resp = h.post("/news/analyze", json!({ "query": "cameroon" })).await;
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_chat_replies_without_corpus() {
    let h = start().await;
    let resp = h
        .post(
            "/chat",
            json!({
                "persona": "You are a personal tutor.",
                "messages": [
                    { "role": "user", "content": "What is a fee?" },
                    { "role": "assistant", "content": "A payment." },
                    { "role": "user", "content": "Give an example." }
                ]
            }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reply"], "Fees are 50,000 FCFA [Source 1].");
    assert_eq!(body["model"], "echo/test");
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 1);

    let history = h.get("/history").await;
    assert_eq!(history["total"], 0);
}

#[tokio::test]
async fn test_chat_ending_on_assistant_turn_is_bad_request() {
    let h = start().await;
    let resp = h
        .post(
            "/chat",
            json!({ "messages": [{ "role": "assistant", "content": "Hello" }] }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}
