//! Decoding structured (JSON) model output.
//!
//! Models often wrap JSON in Markdown fences or add a sentence around it.
//! `parse_json` strips fences, takes the outermost object or array, and
//! deserializes it. Failures keep the raw model text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use lectern_core::{Error, Result};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)```").unwrap());

/// Body of the first fenced code block, or the whole text.
fn strip_fences(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Slice from the first `{`/`[` to the last matching closer.
fn outermost_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output into `T`.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let body = strip_fences(raw).trim();
    let candidate = outermost_json(body).unwrap_or(body);
    serde_json::from_str(candidate).map_err(|e| Error::Parse {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}
