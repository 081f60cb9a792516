//! Runtime orchestration.
//!
//! `Assistant` runs the RAG flow: corpus build (load → chunk → index), then
//! per question gate → retrieve → synthesize → best-effort history append.
//! `analyst` holds the smaller prompt → parse → persist flows, and
//! `companion` the persona conversations that run without the corpus.

pub mod analyst;
pub mod assistant;
pub mod companion;
pub mod types;

pub use analyst::{NEWS_COLLECTION, NewsAnalysis, NewsAnalyst, NewsReport, Recipe, RecipeWriter, WeatherAdvisor};
pub use assistant::Assistant;
pub use companion::{Conversation, ExpertProfile, Explainer, Journal, JournalEntry};
pub use types::*;
