//! Query outcome types.

use serde::{Deserialize, Serialize};

use lectern_ingest::Chunk;

/// Terminal state of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Answered,
    RejectedOffTopic,
    NoRelevantContext,
    Error,
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStatus::Answered => write!(f, "answered"),
            QueryStatus::RejectedOffTopic => write!(f, "rejected_off_topic"),
            QueryStatus::NoRelevantContext => write!(f, "no_relevant_context"),
            QueryStatus::Error => write!(f, "error"),
        }
    }
}

/// Everything known about one answered (or refused) question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub question: String,
    pub admitted: bool,
    pub retrieved_chunks: Vec<Chunk>,
    pub answer_text: String,
    pub status: QueryStatus,
}

impl QueryResult {
    pub fn rejected(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            admitted: false,
            retrieved_chunks: Vec::new(),
            answer_text: message.into(),
            status: QueryStatus::RejectedOffTopic,
        }
    }

    pub fn no_context(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            admitted: true,
            retrieved_chunks: Vec::new(),
            answer_text: message.into(),
            status: QueryStatus::NoRelevantContext,
        }
    }

    pub fn answered(question: impl Into<String>, chunks: Vec<Chunk>, answer: String) -> Self {
        Self {
            question: question.into(),
            admitted: true,
            retrieved_chunks: chunks,
            answer_text: answer,
            status: QueryStatus::Answered,
        }
    }

    /// An admitted query that failed in retrieval or synthesis.
    pub fn failed(question: impl Into<String>, chunks: Vec<Chunk>, message: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            admitted: true,
            retrieved_chunks: chunks,
            answer_text: message.into(),
            status: QueryStatus::Error,
        }
    }
}

/// A retrieved chunk as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSource {
    /// 1-based label matching `[Source i]` in the prompt.
    pub label: usize,
    pub source_ref: String,
    pub chunk_index: usize,
    pub excerpt: String,
}

impl ContextSource {
    const EXCERPT_CHARS: usize = 200;

    pub fn from_chunks(chunks: &[Chunk]) -> Vec<Self> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| Self {
                label: i + 1,
                source_ref: c.source_ref.clone(),
                chunk_index: c.chunk_index,
                excerpt: c.text.chars().take(Self::EXCERPT_CHARS).collect(),
            })
            .collect()
    }
}

/// SSE stream event types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Context { sources: Vec<ContextSource> },
    Token { content: String },
    Done {
        status: QueryStatus,
        #[serde(rename = "tokensUsed")]
        tokens_used: usize,
        duration: u64,
    },
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&QueryStatus::NoRelevantContext).unwrap();
        assert_eq!(json, "\"no_relevant_context\"");
        assert_eq!(QueryStatus::RejectedOffTopic.to_string(), "rejected_off_topic");
    }

    #[test]
    fn test_stream_event_shape() {
        let event = StreamEvent::Done {
            status: QueryStatus::Answered,
            tokens_used: 12,
            duration: 40,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "done");
        assert_eq!(value["status"], "answered");
        assert_eq!(value["tokensUsed"], 12);
    }
}
