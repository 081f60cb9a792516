//! Index and history data types.

use serde::{Deserialize, Serialize};

use lectern_ingest::Chunk;

/// One indexed chunk and its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A retrieved chunk with its cosine distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// `1 - cosine similarity`; smaller is closer.
    pub distance: f32,
}

/// A stored history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub collection: String,
    pub payload: serde_json::Value,
    /// Unix millis.
    pub created_at: i64,
}

/// Index-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub built: bool,
    pub entries: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub cached_queries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
