//! Lectern Core: error taxonomy, configuration, data directory layout.

pub mod config;
pub mod error;

pub use config::{
    AssistantSettings, ChunkingSettings, DataPaths, GateSettings, LecternConfig, LoaderSettings,
    RetrievalSettings, SourceKind, SourceSpec, require_env,
};
pub use error::{Error, Result};
