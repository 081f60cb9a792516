//! LLM configuration persistence and provider selection.
//!
//! Stored as `llm-config.json` under the data directory:
//!
//! ```json
//! {
//!   "preferred_provider": "auto",
//!   "providers": { "groq": { "api_key": "gsk-...", "model": "llama-3.3-70b-versatile" } },
//!   "temperature": 0.2,
//!   "max_tokens": 2048
//! }
//! ```
//!
//! Providers missing from the file get their default model, and keys missing
//! from the file are read from the provider's environment variable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lectern_core::{Error, Result};

use crate::types::{LLMConfigResponse, LLMProvider, ProviderSummary, ProviderTarget};

pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_TOKENS: usize = 2048;

/// Key and model for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
}

impl ProviderSlot {
    fn for_provider(provider: LLMProvider) -> Self {
        Self {
            api_key: None,
            model: provider.default_model().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// A provider name, or "auto".
    pub preferred_provider: String,
    pub providers: BTreeMap<LLMProvider, ProviderSlot>,
    pub temperature: f64,
    pub max_tokens: usize,
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// On-disk shape; every field optional.
#[derive(Deserialize, Default)]
#[serde(default)]
struct StoredConfig {
    preferred_provider: Option<String>,
    providers: BTreeMap<LLMProvider, ProviderSlot>,
    temperature: Option<f64>,
    max_tokens: Option<usize>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            providers: LLMProvider::ALL
                .into_iter()
                .map(|p| (p, ProviderSlot::for_provider(p)))
                .collect(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            config_path: PathBuf::new(),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl LLMConfig {
    /// Load from `config_path`, then fill keys from the environment.
    ///
    /// An unreadable or malformed file is logged and ignored.
    pub fn load(config_path: &Path) -> Self {
        let stored = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str::<StoredConfig>(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", config_path.display(), e);
                StoredConfig::default()
            }),
            Err(_) => StoredConfig::default(),
        };

        let mut config = LLMConfig::default();
        config.providers.extend(stored.providers);
        if let Some(p) = stored.preferred_provider {
            config.preferred_provider = p;
        }
        if let Some(t) = stored.temperature {
            config.temperature = t;
        }
        if let Some(m) = stored.max_tokens {
            config.max_tokens = m;
        }
        config.config_path = config_path.to_path_buf();

        for (provider, slot) in config.providers.iter_mut() {
            if slot.api_key.is_none() {
                slot.api_key = env_value(provider.key_var());
            }
        }
        if let Some(p) = env_value("LECTERN_LLM_PROVIDER") {
            config.preferred_provider = p;
        }

        config
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, serde_json::to_string_pretty(self)?)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    pub fn slot_mut(&mut self, provider: LLMProvider) -> &mut ProviderSlot {
        self.providers
            .entry(provider)
            .or_insert_with(|| ProviderSlot::for_provider(provider))
    }

    fn target_for(&self, provider: LLMProvider) -> Option<ProviderTarget> {
        let slot = self.providers.get(&provider)?;
        let key = slot.api_key.as_ref()?;
        Some(ProviderTarget::new(provider, slot.model.clone(), key.clone()))
    }

    /// The preferred provider if it has a key; in auto mode the first keyed
    /// provider in `LLMProvider::ALL` order.
    pub fn resolve_provider(&self) -> Option<ProviderTarget> {
        if self.preferred_provider == "auto" {
            return LLMProvider::ALL
                .into_iter()
                .find_map(|p| self.target_for(p));
        }
        LLMProvider::parse(&self.preferred_provider).and_then(|p| self.target_for(p))
    }

    /// Like `resolve_provider`, but a missing key is a configuration error.
    pub fn require_provider(&self) -> Result<ProviderTarget> {
        self.resolve_provider().ok_or_else(|| {
            if self.preferred_provider == "auto" {
                let vars: Vec<&str> = LLMProvider::ALL.iter().map(|p| p.key_var()).collect();
                Error::Config(format!("no LLM API key: set one of {}", vars.join(", ")))
            } else {
                Error::Config(format!(
                    "provider '{}' selected but its API key is not set",
                    self.preferred_provider
                ))
            }
        })
    }

    pub fn to_response(&self) -> LLMConfigResponse {
        let active = self.resolve_provider();
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            providers: self
                .providers
                .iter()
                .map(|(provider, slot)| ProviderSummary {
                    provider: *provider,
                    model: slot.model.clone(),
                    configured: slot.api_key.is_some(),
                })
                .collect(),
            active_provider: active.as_ref().map(|t| t.provider),
            active_model: active.map(|t| t.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keyed() -> LLMConfig {
        let mut config = LLMConfig::default();
        config.slot_mut(LLMProvider::OpenAI).api_key = Some("sk-openai".into());
        config.slot_mut(LLMProvider::Groq).api_key = Some("gsk-groq".into());
        config
    }

    #[test]
    fn test_auto_prefers_gemini_then_anthropic_then_groq() {
        let mut config = keyed();
        assert_eq!(config.resolve_provider().unwrap().provider, LLMProvider::Groq);

        config.slot_mut(LLMProvider::Gemini).api_key = Some("g".into());
        let target = config.resolve_provider().unwrap();
        assert_eq!(target.provider, LLMProvider::Gemini);
        assert_eq!(target.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_explicit_provider_without_key_is_config_error() {
        let config = LLMConfig {
            preferred_provider: "anthropic".into(),
            ..keyed()
        };
        assert!(config.resolve_provider().is_none());
        assert!(matches!(config.require_provider(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_other_providers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(
            &path,
            r#"{"preferred_provider":"openai","providers":{"openai":{"model":"gpt-4o"}},"temperature":0.5}"#,
        )
        .unwrap();

        let config = LLMConfig::load(&path);
        assert_eq!(config.preferred_provider, "openai");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.providers[&LLMProvider::OpenAI].model, "gpt-4o");
        assert_eq!(
            config.providers[&LLMProvider::Anthropic].model,
            "claude-sonnet-4-20250514"
        );
    }

    #[test]
    fn test_save_and_reload_keeps_keys_out_of_response() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm-config.json");
        let mut config = LLMConfig {
            preferred_provider: "openai".into(),
            ..keyed()
        };
        config.slot_mut(LLMProvider::OpenAI).model = "gpt-4o".into();
        config.config_path = path.clone();
        config.save().unwrap();

        let reloaded = LLMConfig::load(&path);
        assert_eq!(reloaded.providers[&LLMProvider::OpenAI].model, "gpt-4o");
        let response = reloaded.to_response();
        assert_eq!(response.active_provider, Some(LLMProvider::OpenAI));
        assert_eq!(response.active_model.as_deref(), Some("gpt-4o"));
        assert!(response
            .providers
            .iter()
            .any(|p| p.provider == LLMProvider::OpenAI && p.configured));
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("sk-openai"));
    }
}
