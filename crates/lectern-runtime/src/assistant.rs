//! Assistant: the build phase and the per-question flow.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use lectern_chat::LanguageModel;
use lectern_core::{LecternConfig, Result, SourceSpec};
use lectern_infer::Embedder;
use lectern_ingest::{Chunk, Document, DocumentLoader, TextSplitter};
use lectern_resolve::{AnswerSynthesizer, PromptSettings, QueryResult, TopicGate};
use lectern_store::{HistoryStore, VectorIndex};

use crate::types::{AssistantStatus, BuildReport, PreparedAnswer, QueryStage};

/// Question-answering assistant over one corpus.
pub struct Assistant {
    sources: Vec<SourceSpec>,
    loader: DocumentLoader,
    splitter: TextSplitter,
    index: VectorIndex,
    gate: TopicGate,
    synthesizer: AnswerSynthesizer,
    history: Option<Arc<HistoryStore>>,
    top_k: usize,
    rejection_message: String,
    model_name: String,
}

impl Assistant {
    /// Wire the pipeline from configuration and injected collaborators.
    ///
    /// The index starts empty; call [`Assistant::build_corpus`] before asking.
    pub fn new(
        config: &LecternConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        history: Option<Arc<HistoryStore>>,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.overlap)?;
        let loader = DocumentLoader::new(config.loader.clone())?;
        let model_name = llm.model_name();

        info!(
            "Assistant initialized: {} sources, chunk_size={}, overlap={}, top_k={}, llm={}, embedder={}",
            config.sources.len(),
            splitter.chunk_size(),
            splitter.chunk_overlap(),
            config.retrieval.top_k,
            model_name,
            embedder.model_name()
        );

        Ok(Self {
            sources: config.sources.clone(),
            loader,
            splitter,
            index: VectorIndex::new(embedder),
            gate: TopicGate::from_settings(&config.gate),
            synthesizer: AnswerSynthesizer::new(llm, PromptSettings::from(&config.assistant)),
            history,
            top_k: config.retrieval.top_k,
            rejection_message: config.assistant.rejection_message.clone(),
            model_name,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_built()
    }

    /// Load every configured source, chunk, and rebuild the index.
    ///
    /// Individual source failures are reported in the returned warnings.
    /// Fails only when no source yields a document; the previous index is
    /// then kept.
    pub async fn build_corpus(&self) -> Result<BuildReport> {
        let started = Instant::now();
        let corpus = self.loader.load_all(&self.sources).await.into_result()?;
        let chunks = self.build_from_documents(&corpus.documents).await?;

        let report = BuildReport {
            documents: corpus.documents.len(),
            chunks,
            duplicates_skipped: corpus.duplicates_skipped,
            warnings: corpus.warnings,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Corpus built: {} documents, {} chunks, {} sources skipped in {}ms",
            report.documents,
            report.chunks,
            report.warnings.len(),
            report.duration_ms
        );
        Ok(report)
    }

    /// Chunk `documents` and rebuild the index from them. Returns the chunk count.
    pub async fn build_from_documents(&self, documents: &[Document]) -> Result<usize> {
        let chunks = self.splitter.split_documents(documents);
        debug!("Split {} documents into {} chunks", documents.len(), chunks.len());
        self.index.build(chunks).await
    }

    /// Answer one question and record the outcome.
    ///
    /// Never fails: retrieval and synthesis errors come back as a result with
    /// `QueryStatus::Error`.
    pub async fn ask(&self, question: &str) -> QueryResult {
        let result = match self.admit_and_retrieve(question).await {
            Ok(chunks) => {
                debug!(stage = %QueryStage::Synthesizing, "{} chunks", chunks.len());
                self.synthesizer.synthesize(question, chunks).await
            }
            Err(settled) => settled,
        };
        self.record(&result);
        result
    }

    /// Run the flow up to synthesis and hand back the token stream.
    ///
    /// Results settled without the model are recorded here; streamed answers
    /// are recorded by [`Assistant::finish_stream`].
    pub async fn prepare_stream(&self, question: &str) -> PreparedAnswer {
        match self.admit_and_retrieve(question).await {
            Ok(chunks) if chunks.is_empty() => {
                let result = QueryResult::no_context(
                    question,
                    &self.synthesizer.settings().no_context_message,
                );
                self.record(&result);
                PreparedAnswer::Finished(result)
            }
            Ok(chunks) => {
                debug!(stage = %QueryStage::Synthesizing, "{} chunks (streaming)", chunks.len());
                let stream = self.synthesizer.synthesize_stream(question, &chunks);
                PreparedAnswer::Streaming { chunks, stream }
            }
            Err(settled) => {
                self.record(&settled);
                PreparedAnswer::Finished(settled)
            }
        }
    }

    /// Close out a streamed answer: build its result and record it.
    pub fn finish_stream(
        &self,
        question: &str,
        chunks: Vec<Chunk>,
        outcome: Result<String>,
    ) -> QueryResult {
        let result = match outcome {
            Ok(answer) => QueryResult::answered(question, chunks, answer),
            Err(e) => {
                QueryResult::failed(question, chunks, format!("Error processing question: {}", e))
            }
        };
        self.record(&result);
        result
    }

    /// Gate and retrieve. `Err` carries a result that is already settled.
    async fn admit_and_retrieve(&self, question: &str) -> std::result::Result<Vec<Chunk>, QueryResult> {
        debug!(stage = %QueryStage::Received, "{}", question);

        if !self.gate.admit(question) {
            debug!(stage = %QueryStage::GateChecked, "rejected off topic");
            return Err(QueryResult::rejected(question, &self.rejection_message));
        }
        debug!(
            stage = %QueryStage::GateChecked,
            "admitted on '{}'",
            self.gate.matched_keyword(question).unwrap_or_default()
        );

        debug!(stage = %QueryStage::Retrieving, "top_k={}", self.top_k);
        match self.index.retrieve(question, self.top_k).await {
            Ok(scored) => Ok(scored.into_iter().map(|s| s.chunk).collect()),
            Err(e) => {
                warn!("Retrieval failed: {}", e);
                Err(QueryResult::failed(
                    question,
                    Vec::new(),
                    format!("Error processing question: {}", e),
                ))
            }
        }
    }

    /// Best-effort history append.
    fn record(&self, result: &QueryResult) {
        let Some(history) = &self.history else {
            return;
        };
        match history.append_result(result) {
            Ok(id) => debug!("Recorded query result {} ({})", id, result.status),
            Err(e) => warn!("Failed to record query result: {}", e),
        }
    }

    pub fn status(&self) -> AssistantStatus {
        let history_records = self.history.as_ref().and_then(|h| match h.count(None) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("History count failed: {}", e);
                None
            }
        });
        AssistantStatus {
            ready: self.is_ready(),
            index: self.index.stats(),
            llm_model: self.model_name.clone(),
            gate_keywords: self.gate.keywords().len(),
            top_k: self.top_k,
            history_records,
        }
    }
}
