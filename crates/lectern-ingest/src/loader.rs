//! Corpus loading: configured sources → documents.
//!
//! Single-source loads fail loudly. `load_all` is best-effort: a failing
//! source is logged and skipped so the rest of the corpus still builds.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use lectern_core::{Error, LoaderSettings, Result, SourceKind, SourceSpec};
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::encyclopedia::Encyclopedia;
use crate::file;
use crate::types::Document;
use crate::web;

/// Pause between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A source that was skipped during a corpus build.
#[derive(Debug, Clone, Serialize)]
pub struct SourceWarning {
    pub source: SourceSpec,
    pub error: String,
}

/// Outcome of loading every configured source.
#[derive(Debug, Default)]
pub struct CorpusLoad {
    pub documents: Vec<Document>,
    pub warnings: Vec<SourceWarning>,
    /// Documents dropped because an identical text was already loaded.
    pub duplicates_skipped: usize,
}

/// Loads documents from files, web pages, and encyclopedia queries.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    client: Client,
    encyclopedia: Encyclopedia,
    settings: LoaderSettings,
}

impl DocumentLoader {
    pub fn new(settings: LoaderSettings) -> Result<Self> {
        let client = web::http_client(Duration::from_secs(settings.timeout_secs))?;
        Ok(Self {
            encyclopedia: Encyclopedia::new(client.clone()),
            client,
            settings,
        })
    }

    /// Use another MediaWiki API endpoint for encyclopedia sources.
    pub fn with_encyclopedia_url(mut self, api_url: impl Into<String>) -> Self {
        self.encyclopedia = self.encyclopedia.with_api_url(api_url);
        self
    }

    /// Load one source, retrying up to `settings.retries` extra times.
    pub async fn load(&self, source: &SourceSpec) -> Result<Vec<Document>> {
        let attempts = self.settings.retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.load_once(source).await {
                Ok(docs) => return Ok(docs),
                Err(e) if attempt < attempts => {
                    debug!(
                        "Attempt {}/{} for {} {} failed: {}",
                        attempt, attempts, source.kind, source.locator, e
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn load_once(&self, source: &SourceSpec) -> Result<Vec<Document>> {
        let docs = match source.kind {
            SourceKind::File => {
                let path = PathBuf::from(&source.locator);
                let text = run_blocking(move || file::extract_text(&path)).await?;
                vec![Document::new(text, SourceKind::File, &source.locator)]
            }
            SourceKind::Web => {
                let page = web::fetch_page(&self.client, &source.locator).await?;
                let doc = Document::new(page.text, SourceKind::Web, &source.locator);
                vec![match page.title {
                    Some(title) => doc.with_title(title),
                    None => doc,
                }]
            }
            SourceKind::Encyclopedia => self
                .encyclopedia
                .search(&source.locator, self.settings.load_max_docs)
                .await?
                .into_iter()
                .map(|a| {
                    Document::new(a.text, SourceKind::Encyclopedia, &source.locator)
                        .with_title(a.title)
                })
                .collect(),
        };

        Ok(docs
            .into_iter()
            .filter(|d| {
                let keep = !d.text.trim().is_empty();
                if !keep {
                    debug!("Dropping empty document from {}", d.locator);
                }
                keep
            })
            .collect())
    }

    /// Load every source, skipping failures and duplicate texts.
    pub async fn load_all(&self, sources: &[SourceSpec]) -> CorpusLoad {
        let mut corpus = CorpusLoad::default();
        let mut seen: HashSet<String> = HashSet::new();

        for source in sources {
            match self.load(source).await {
                Ok(docs) => {
                    for doc in docs {
                        if seen.insert(content_hash(&doc.text)) {
                            corpus.documents.push(doc);
                        } else {
                            debug!("Duplicate content, skipping: {}", doc.locator);
                            corpus.duplicates_skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping {} source {}: {}", source.kind, source.locator, e);
                    corpus.warnings.push(SourceWarning {
                        source: source.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded {} documents from {} sources ({} skipped, {} duplicates)",
            corpus.documents.len(),
            sources.len(),
            corpus.warnings.len(),
            corpus.duplicates_skipped
        );
        corpus
    }
}

impl CorpusLoad {
    /// True when nothing at all could be loaded.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_result(self) -> Result<Self> {
        if self.is_empty() {
            Err(Error::Load(format!(
                "no documents loaded ({} sources failed)",
                self.warnings.len()
            )))
        } else {
            Ok(self)
        }
    }
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Run file parsing on the blocking pool so a rebuild served over HTTP
/// does not stall the runtime.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("blocking load task failed: {}", e)))?
}
