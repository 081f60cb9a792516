//! Error types for Lectern.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A source could not be fetched or read.
    #[error("Load error: {0}")]
    Load(String),

    /// Retrieval before build, or an embedding dimension mismatch.
    #[error("Index error: {0}")]
    Index(String),

    /// LLM or embedding API failure, including timeouts.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Structured output could not be decoded. `raw` keeps the model text.
    #[error("Parse error: {message}")]
    Parse { message: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Raw model output attached to a parse failure, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
