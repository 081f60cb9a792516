//! Runtime types.

use serde::Serialize;

use lectern_chat::BoxedStream;
use lectern_ingest::{Chunk, SourceWarning};
use lectern_resolve::QueryResult;
use lectern_store::IndexStats;

/// Outcome of a corpus build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub duplicates_skipped: usize,
    pub warnings: Vec<SourceWarning>,
    pub duration_ms: u64,
}

/// Transient stages of one query, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    GateChecked,
    Retrieving,
    Synthesizing,
}

impl std::fmt::Display for QueryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStage::Received => write!(f, "received"),
            QueryStage::GateChecked => write!(f, "gate_checked"),
            QueryStage::Retrieving => write!(f, "retrieving"),
            QueryStage::Synthesizing => write!(f, "synthesizing"),
        }
    }
}

/// A question taken as far as synthesis, for callers that forward tokens.
pub enum PreparedAnswer {
    /// Settled without the model (rejected, no context, retrieval error).
    Finished(QueryResult),
    /// Admitted with context; tokens still to come.
    Streaming {
        chunks: Vec<Chunk>,
        stream: BoxedStream,
    },
}

/// Snapshot for status endpoints and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantStatus {
    pub ready: bool,
    pub index: IndexStats,
    pub llm_model: String,
    pub gate_keywords: usize,
    pub top_k: usize,
    /// `None` when history is disabled or unreadable.
    pub history_records: Option<i64>,
}
