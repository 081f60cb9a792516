//! Grounded answer synthesis.
//!
//! Retrieved chunks are labelled `[Source i]` in retrieval order and placed
//! in a single prompt that tells the model to answer only from that context.
//! The model's reply is used verbatim.

use std::sync::Arc;

use futures::stream;
use tracing::{debug, warn};

use lectern_chat::{BoxedStream, LanguageModel, StreamChunk};
use lectern_core::AssistantSettings;
use lectern_ingest::Chunk;

use crate::types::QueryResult;

/// Wording the synthesizer puts in front of the model and the user.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    /// E.g. "the University of Bamenda".
    pub domain_name: String,
    /// Phrase the model must reply with when the context lacks the answer.
    pub unknown_phrase: String,
    /// Returned without calling the model when nothing was retrieved.
    pub no_context_message: String,
}

impl From<&AssistantSettings> for PromptSettings {
    fn from(s: &AssistantSettings) -> Self {
        Self {
            domain_name: s.domain_name.clone(),
            unknown_phrase: s.unknown_phrase.clone(),
            no_context_message: s.no_context_message.clone(),
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self::from(&AssistantSettings::default())
    }
}

/// Labelled context block: `[Source i]\n<text>` joined by blank lines.
pub fn context_block(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[Source {}]\n{}", i + 1, c.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    settings: PromptSettings,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, settings: PromptSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &PromptSettings {
        &self.settings
    }

    pub fn build_prompt(&self, question: &str, chunks: &[Chunk]) -> String {
        format!(
            "You are an AI assistant for {domain}. Use the following context to answer the question.\n\
             If the answer is not in the context, say \"{unknown}\"\n\
             \n\
             Context: {context}\n\
             \n\
             Question: {question}\n\
             \n\
             Answer (with sources if possible):\n",
            domain = self.settings.domain_name,
            unknown = self.settings.unknown_phrase,
            context = context_block(chunks),
            question = question,
        )
    }

    /// Answer `question` from `chunks` with exactly one model call.
    ///
    /// No chunks means no call: the fixed no-context message is returned.
    /// A transport failure yields an `Error` result carrying the cause.
    pub async fn synthesize(&self, question: &str, chunks: Vec<Chunk>) -> QueryResult {
        if chunks.is_empty() {
            debug!("No context retrieved, skipping LLM call");
            return QueryResult::no_context(question, &self.settings.no_context_message);
        }

        let prompt = self.build_prompt(question, &chunks);
        match self.llm.invoke(&prompt).await {
            Ok(answer) => QueryResult::answered(question, chunks, answer),
            Err(e) => {
                warn!("Answer synthesis failed: {}", e);
                QueryResult::failed(question, chunks, format!("Error processing question: {}", e))
            }
        }
    }

    /// Same prompt as `synthesize`, exposed as a fragment stream.
    pub fn synthesize_stream(&self, question: &str, chunks: &[Chunk]) -> BoxedStream {
        if chunks.is_empty() {
            return Box::pin(stream::iter(vec![
                StreamChunk::Token(self.settings.no_context_message.clone()),
                StreamChunk::Done { tokens_used: 0 },
            ]));
        }
        self.llm.stream(&self.build_prompt(question, chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_stream::StreamExt;

    /// Replies with a fixed script and counts calls.
    struct ScriptedModel {
        reply: std::result::Result<Vec<&'static str>, &'static str>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn ok(fragments: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(fragments),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn stream(&self, prompt: &str) -> BoxedStream {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            let chunks: Vec<StreamChunk> = match &self.reply {
                Ok(fragments) => fragments
                    .iter()
                    .map(|f| StreamChunk::Token(f.to_string()))
                    .chain(std::iter::once(StreamChunk::Done {
                        tokens_used: fragments.len(),
                    }))
                    .collect(),
                Err(message) => vec![StreamChunk::Error(message.to_string())],
            };
            Box::pin(stream::iter(chunks))
        }

        fn model_name(&self) -> String {
            "scripted".into()
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            overlap_with_previous: 0,
            source_ref: "uba.pdf".to_string(),
            chunk_index: 0,
            char_start: 0,
        }
    }

    #[tokio::test]
    async fn test_empty_retrieval_never_calls_model() {
        let model = ScriptedModel::ok(vec!["unused"]);
        let synth = AnswerSynthesizer::new(model.clone(), PromptSettings::default());

        let result = synth.synthesize("Where is the library?", Vec::new()).await;
        assert_eq!(result.status, QueryStatus::NoRelevantContext);
        assert_eq!(result.answer_text, "I don't know from the available documents.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_labels_sources_in_order_and_answer_is_verbatim() {
        let model = ScriptedModel::ok(vec!["Fees are ", "50,000 FCFA [Source 2]."]);
        let synth = AnswerSynthesizer::new(model.clone(), PromptSettings::default());

        let result = synth
            .synthesize(
                "What are the tuition fees?",
                vec![chunk("The library opens at 8."), chunk("Tuition is 50,000 FCFA.")],
            )
            .await;

        assert_eq!(result.status, QueryStatus::Answered);
        assert_eq!(result.answer_text, "Fees are 50,000 FCFA [Source 2].");
        assert_eq!(result.retrieved_chunks.len(), 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        let first = prompt.find("[Source 1]\nThe library opens at 8.").unwrap();
        let second = prompt.find("[Source 2]\nTuition is 50,000 FCFA.").unwrap();
        assert!(first < second);
        assert!(prompt.contains("University of Bamenda"));
        assert!(prompt.contains("Question: What are the tuition fees?"));
        assert!(prompt.contains("say \"I don't know from the available documents.\""));
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_status_with_cause() {
        let model = ScriptedModel::failing("API error 503: overloaded");
        let synth = AnswerSynthesizer::new(model, PromptSettings::default());

        let result = synth.synthesize("Any faculty news?", vec![chunk("x")]).await;
        assert_eq!(result.status, QueryStatus::Error);
        assert!(result.answer_text.contains("overloaded"));
        assert!(result.admitted);
    }

    #[tokio::test]
    async fn test_stream_without_context_yields_fallback() {
        let model = ScriptedModel::ok(vec!["unused"]);
        let synth = AnswerSynthesizer::new(model.clone(), PromptSettings::default());

        let chunks: Vec<StreamChunk> = synth.synthesize_stream("q", &[]).collect().await;
        assert_eq!(
            chunks[0],
            StreamChunk::Token("I don't know from the available documents.".into())
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
