//! Lectern Ingest: document loading, text chunking, external context feeds.

pub mod chunking;
pub mod encyclopedia;
pub mod feeds;
pub mod file;
pub mod loader;
pub mod types;
pub mod web;

pub use chunking::TextSplitter;
pub use feeds::{NewsFeed, WeatherFeed};
pub use lectern_core::{SourceKind, SourceSpec};
pub use loader::{CorpusLoad, DocumentLoader, SourceWarning};
pub use types::{Chunk, Document};
