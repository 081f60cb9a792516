//! Shared application state.

use std::sync::Arc;

use lectern_chat::{HttpLanguageModel, LLMConfig, LanguageModel};
use lectern_core::{LecternConfig, Result};
use lectern_infer::Embedder;
use lectern_ingest::NewsFeed;
use lectern_runtime::{Assistant, NewsAnalyst};
use lectern_store::HistoryStore;
use tracing::info;

/// Shared application state accessible from all route handlers and commands.
pub struct AppState {
    pub config: LecternConfig,
    pub llm_config: LLMConfig,
    pub llm: Arc<dyn LanguageModel>,
    pub assistant: Assistant,
    pub history: Option<Arc<HistoryStore>>,
    /// Present when `NEWS_API_KEY` is set.
    pub news: Option<NewsAnalyst>,
    /// Held for the duration of a corpus rebuild.
    pub rebuild_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Construct every collaborator from configuration and the environment.
    ///
    /// Missing LLM or embedding keys fail here with `Error::Config`.
    pub fn init(config: LecternConfig) -> Result<Self> {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        let llm: Arc<dyn LanguageModel> = Arc::new(HttpLanguageModel::from_config(&llm_config)?);
        let embedder = lectern_infer::create_embedder()?;
        let history = Arc::new(HistoryStore::open(&config.data_paths.history_dir)?);

        let news = match NewsFeed::from_env() {
            Ok(feed) => Some(NewsAnalyst::new(feed, llm.clone(), Some(history.clone()))?),
            Err(e) => {
                info!("News analysis disabled: {}", e);
                None
            }
        };

        Self::from_parts(config, llm_config, embedder, llm, Some(history), news)
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: LecternConfig,
        llm_config: LLMConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        history: Option<Arc<HistoryStore>>,
        news: Option<NewsAnalyst>,
    ) -> Result<Self> {
        let assistant = Assistant::new(&config, embedder, llm.clone(), history.clone())?;
        Ok(Self {
            config,
            llm_config,
            llm,
            assistant,
            history,
            news,
            rebuild_lock: tokio::sync::Mutex::new(()),
        })
    }
}
