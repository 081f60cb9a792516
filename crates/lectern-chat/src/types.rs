//! Chat types shared by providers and callers.

use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    Anthropic,
    Groq,
}

impl LLMProvider {
    /// Auto-selection order.
    pub const ALL: [LLMProvider; 4] = [
        LLMProvider::Gemini,
        LLMProvider::Anthropic,
        LLMProvider::Groq,
        LLMProvider::OpenAI,
    ];

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "gemini-2.5-flash",
            LLMProvider::OpenAI => "gpt-4o-mini",
            LLMProvider::Anthropic => "claude-sonnet-4-20250514",
            LLMProvider::Groq => "llama-3.3-70b-versatile",
        }
    }

    /// Environment variable consulted when the config file has no key.
    pub fn key_var(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "GOOGLE_API_KEY",
            LLMProvider::OpenAI => "OPENAI_API_KEY",
            LLMProvider::Anthropic => "ANTHROPIC_API_KEY",
            LLMProvider::Groq => "GROQ_API_KEY",
        }
    }

    /// API root used unless overridden.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::Anthropic => "https://api.anthropic.com/v1",
            LLMProvider::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LLMProvider::Gemini),
            "openai" => Some(LLMProvider::OpenAI),
            "anthropic" => Some(LLMProvider::Anthropic),
            "groq" => Some(LLMProvider::Groq),
            _ => None,
        }
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// One message in a provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Everything needed to address one provider.
#[derive(Debug, Clone)]
pub struct ProviderTarget {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
}

impl ProviderTarget {
    pub fn new(provider: LLMProvider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// One provider as reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider: LLMProvider,
    pub model: String,
    pub configured: bool,
}

/// LLM config as exposed over HTTP. Never carries keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LLMConfigResponse {
    pub preferred_provider: String,
    pub providers: Vec<ProviderSummary>,
    pub active_provider: Option<LLMProvider>,
    pub active_model: Option<String>,
}
