//! Lectern Store: cosine vector index over chunks + append-only SQLite history.

pub mod history;
pub mod index;
pub mod schema;
pub mod types;

pub use history::{HistoryStore, QUERY_RESULTS_COLLECTION};
pub use index::{VectorIndex, DEFAULT_TOP_K};
pub use types::*;
