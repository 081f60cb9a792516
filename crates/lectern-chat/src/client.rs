//! The `LanguageModel` seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_stream::StreamExt;
use tracing::debug;

use lectern_core::{Error, Result};

use crate::config::LLMConfig;
use crate::providers::{stream_llm, BoxedStream, Sampling, StreamChunk};
use crate::types::{ChatMessage, ProviderTarget};

/// Upper bound on one LLM request, including the streamed body.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// A hosted text-generation model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Lazily stream the completion for `prompt`. Finite, not restartable.
    fn stream(&self, prompt: &str) -> BoxedStream;

    /// Stream the next assistant turn of a role-tagged conversation.
    ///
    /// Models without native multi-message support see the conversation as
    /// one labelled transcript.
    fn stream_messages(&self, messages: &[ChatMessage]) -> BoxedStream {
        self.stream(&render_transcript(messages))
    }

    /// Run `prompt` to completion and return the concatenated text.
    ///
    /// A `StreamChunk::Error` becomes `Error::Transport`.
    async fn invoke(&self, prompt: &str) -> Result<String> {
        collect_text(self.stream(prompt)).await
    }

    /// Run a conversation to completion; errors as in `invoke`.
    async fn invoke_messages(&self, messages: &[ChatMessage]) -> Result<String> {
        collect_text(self.stream_messages(messages)).await
    }

    /// Provider/model label for logs and status output.
    fn model_name(&self) -> String;
}

/// Concatenate a stream's tokens, stopping at `Done`.
pub async fn collect_text(mut stream: BoxedStream) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(t) => text.push_str(&t),
            StreamChunk::Done { .. } => break,
            StreamChunk::Error(e) => return Err(Error::Transport(e)),
        }
    }
    Ok(text)
}

/// Flatten a conversation into a single prompt ending with an open
/// assistant turn.
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let label = match message.role.as_str() {
            "system" => "System",
            "assistant" => "Assistant",
            _ => "User",
        };
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&message.content);
        out.push_str("\n\n");
    }
    out.push_str("Assistant:");
    out
}

/// `LanguageModel` over a provider's streaming HTTP API.
pub struct HttpLanguageModel {
    client: Client,
    target: ProviderTarget,
    sampling: Sampling,
}

impl HttpLanguageModel {
    pub fn new(target: ProviderTarget) -> Result<Self> {
        let client = Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            client,
            target,
            sampling: Sampling {
                temperature: crate::config::DEFAULT_TEMPERATURE,
                max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            },
        })
    }

    /// Build from the persisted config. No usable key is `Error::Config`.
    pub fn from_config(config: &LLMConfig) -> Result<Self> {
        let target = config.require_provider()?;
        debug!("LLM provider {} model {}", target.provider, target.model);
        Ok(Self::new(target)?.with_sampling(config.temperature, config.max_tokens))
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: usize) -> Self {
        self.sampling = Sampling {
            temperature,
            max_tokens,
        };
        self
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    fn stream(&self, prompt: &str) -> BoxedStream {
        self.stream_messages(&[ChatMessage::user(prompt)])
    }

    fn stream_messages(&self, messages: &[ChatMessage]) -> BoxedStream {
        stream_llm(&self.client, &self.target, messages.to_vec(), self.sampling)
    }

    fn model_name(&self) -> String {
        format!("{}/{}", self.target.provider, self.target.model)
    }
}
