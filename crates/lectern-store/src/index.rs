//! In-memory cosine similarity index over chunk embeddings.
//!
//! Vectors are L2-normalized into one `(N, dim)` matrix at build time so a
//! query is a single matrix-vector product. The index is read-only once
//! built; `build` swaps in a complete replacement under the write lock.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use parking_lot::RwLock;
use tracing::{debug, info};

use lectern_core::{Error, Result};
use lectern_infer::{Embedder, QueryCache};
use lectern_ingest::Chunk;

use crate::types::{IndexEntry, IndexStats, ScoredChunk};

/// Chunks returned per query unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 3;

struct IndexState {
    /// Normalized embeddings, shape (N, dim).
    matrix: Array2<f32>,
    /// Chunk for each matrix row, in insertion order.
    chunks: Vec<Chunk>,
}

/// Cosine vector index bound to one embedder.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    state: RwLock<Option<IndexState>>,
    cache: QueryCache,
}

impl VectorIndex {
    /// Create an empty, unbuilt index.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(None),
            cache: QueryCache::default(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn is_built(&self) -> bool {
        self.state.read().is_some()
    }

    /// Number of indexed chunks (0 before build).
    pub fn len(&self) -> usize {
        self.state.read().as_ref().map_or(0, |s| s.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed `chunks` and replace the index contents.
    ///
    /// On error the previous index (if any) is left untouched.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };

        if vectors.len() != chunks.len() {
            return Err(Error::Index(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| IndexEntry { vector, chunk })
            .collect();
        self.replace(entries)
    }

    /// Replace the index with precomputed entries.
    pub fn replace(&self, entries: Vec<IndexEntry>) -> Result<usize> {
        let dim = self.dimension();
        let n = entries.len();
        let mut matrix = Array2::zeros((n, dim));
        let mut chunks = Vec::with_capacity(n);

        for (i, entry) in entries.into_iter().enumerate() {
            if entry.vector.len() != dim {
                return Err(Error::Index(format!(
                    "embedding for chunk {} of {} has dimension {}, index expects {}",
                    entry.chunk.chunk_index,
                    entry.chunk.source_ref,
                    entry.vector.len(),
                    dim
                )));
            }
            matrix.row_mut(i).assign(&Array1::from(entry.vector));
            chunks.push(entry.chunk);
        }

        for mut row in matrix.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 1e-9 {
                row /= norm;
            }
        }

        *self.state.write() = Some(IndexState { matrix, chunks });
        self.cache.clear();
        info!("Vector index built: {} chunks, dim={}", n, dim);
        Ok(n)
    }

    /// The `k` chunks closest to `query`, nearest first.
    ///
    /// Equal distances keep insertion order. Fails before `build`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.is_built() {
            return Err(Error::Index("retrieve called before build".into()));
        }

        let q = self.query_vector(query).await?;

        let guard = self.state.read();
        let state = guard
            .as_ref()
            .ok_or_else(|| Error::Index("index was cleared during retrieval".into()))?;
        if state.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        // (N, dim) @ (dim,) → (N,)
        let similarities = state.matrix.dot(&q);

        let mut ranked: Vec<(usize, f32)> = similarities
            .iter()
            .enumerate()
            .map(|(i, &s)| (i, 1.0 - s))
            .collect();
        // Stable sort: ties stay in insertion order.
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(k);

        debug!("Retrieved {} of {} chunks for query", ranked.len(), state.chunks.len());
        Ok(ranked
            .into_iter()
            .map(|(i, distance)| ScoredChunk {
                chunk: state.chunks[i].clone(),
                distance,
            })
            .collect())
    }

    /// Normalized embedding of the trimmed query, served from cache when
    /// possible.
    async fn query_vector(&self, query: &str) -> Result<Array1<f32>> {
        let query = query.trim();
        if let Some(cached) = self.cache.get(query) {
            return Ok(cached);
        }

        let raw = self.embedder.embed(query).await?;
        if raw.len() != self.dimension() {
            return Err(Error::Index(format!(
                "query embedding has dimension {}, index expects {}",
                raw.len(),
                self.dimension()
            )));
        }

        let mut q = Array1::from(raw);
        let norm = q.dot(&q).sqrt();
        if norm > 1e-9 {
            q /= norm;
        }
        self.cache.put(query, q.clone());
        Ok(q)
    }

    pub fn stats(&self) -> IndexStats {
        let cache = self.cache.stats();
        IndexStats {
            built: self.is_built(),
            entries: self.len(),
            dimension: self.dimension(),
            embedding_model: self.embedder.model_name().to_string(),
            cached_queries: cache.entries,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
        }
    }
}
