//! LLM collaborator for Lectern.
//!
//! `LanguageModel` is the seam the synthesizer and analysis flows call
//! through. `HttpLanguageModel` streams from Gemini, OpenAI, Anthropic, or
//! Groq over SSE, either a single prompt or a role-tagged conversation.
//! Prompt templating and structured-output decoding live alongside.

pub mod client;
pub mod config;
pub mod parser;
pub mod providers;
pub mod template;
pub mod types;

pub use client::{collect_text, HttpLanguageModel, LanguageModel};
pub use config::LLMConfig;
pub use parser::parse_json;
pub use providers::{BoxedStream, StreamChunk};
pub use template::{ChatPromptTemplate, PromptTemplate};
pub use types::*;
