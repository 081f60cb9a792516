//! Lectern Infer: embedding clients and the query embedding cache.
//!
//! The `Embedder` trait is the seam the vector index builds against.
//! `create_embedder` picks a hosted backend from the environment.

pub mod cache;
pub mod embedder;

pub use cache::{CacheStats, QueryCache};
pub use embedder::{Embedder, GeminiEmbedder, OpenAiEmbedder};

use std::sync::Arc;

use lectern_core::{require_env, Error, Result};

/// Create the configured embedder.
///
/// `LECTERN_EMBEDDER` selects `gemini` or `openai`. When unset, Gemini is
/// used if `GOOGLE_API_KEY` is present, then OpenAI if `OPENAI_API_KEY` is.
pub fn create_embedder() -> Result<Arc<dyn Embedder>> {
    let choice = std::env::var("LECTERN_EMBEDDER")
        .ok()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty());

    let embedder: Arc<dyn Embedder> = match choice.as_deref() {
        Some("gemini") => Arc::new(GeminiEmbedder::new(require_env("GOOGLE_API_KEY")?)?),
        Some("openai") => Arc::new(OpenAiEmbedder::new(require_env("OPENAI_API_KEY")?)?),
        Some(other) => {
            return Err(Error::Config(format!("unknown embedder '{}'", other)));
        }
        None => {
            if let Ok(key) = require_env("GOOGLE_API_KEY") {
                Arc::new(GeminiEmbedder::new(key)?)
            } else if let Ok(key) = require_env("OPENAI_API_KEY") {
                Arc::new(OpenAiEmbedder::new(key)?)
            } else {
                return Err(Error::Config(
                    "no embedding API key: set GOOGLE_API_KEY or OPENAI_API_KEY".into(),
                ));
            }
        }
    };

    tracing::info!(
        "Using {} embedder (dim={})",
        embedder.model_name(),
        embedder.dimension()
    );
    Ok(embedder)
}
