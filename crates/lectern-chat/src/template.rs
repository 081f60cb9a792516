//! Prompt templates with `{name}` placeholders.
//!
//! `{{` and `}}` produce literal braces, so JSON examples can be embedded in
//! a template. `ChatPromptTemplate` applies the same substitution to every
//! turn of a role-tagged conversation.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use lectern_core::{Error, Result};

use crate::types::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse `template`. Unbalanced or empty braces are `Error::Config`.
    pub fn new(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) if ch.is_alphanumeric() || ch == '_' => name.push(ch),
                            Some(ch) => {
                                return Err(Error::Config(format!(
                                    "invalid character '{}' in placeholder '{{{}'",
                                    ch, name
                                )))
                            }
                            None => {
                                return Err(Error::Config(format!(
                                    "unclosed placeholder '{{{}'",
                                    name
                                )))
                            }
                        }
                    }
                    if name.is_empty() {
                        return Err(Error::Config("empty placeholder '{}'".into()));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => {
                    return Err(Error::Config(
                        "unmatched '}' in template (use '}}' for a literal brace)".into(),
                    ))
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Var(name) = segment {
                if !seen.contains(&name.as_str()) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Substitute every placeholder. A missing variable is `Error::Config`;
    /// extra variables are ignored.
    pub fn format<K, V>(&self, vars: &HashMap<K, V>) -> Result<String>
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = vars.get(name.as_str()).ok_or_else(|| {
                        Error::Config(format!("missing template variable '{}'", name))
                    })?;
                    out.push_str(value.as_ref());
                }
            }
        }
        Ok(out)
    }
}

/// A conversation of templated turns.
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    turns: Vec<(&'static str, PromptTemplate)>,
}

/// Canonical role for a turn label. "human" and "ai" are accepted aliases.
fn canonical_role(role: &str) -> Result<&'static str> {
    match role.trim().to_lowercase().as_str() {
        "system" => Ok("system"),
        "user" | "human" => Ok("user"),
        "assistant" | "ai" => Ok("assistant"),
        other => Err(Error::Config(format!("unknown message role '{}'", other))),
    }
}

impl ChatPromptTemplate {
    /// Parse `(role, template)` pairs.
    pub fn from_messages(turns: &[(&str, &str)]) -> Result<Self> {
        let turns = turns
            .iter()
            .map(|(role, template)| Ok((canonical_role(role)?, PromptTemplate::new(template)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { turns })
    }

    /// Placeholder names across all turns, in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (_, template) in &self.turns {
            for name in template.variables() {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    pub fn format_messages<K, V>(&self, vars: &HashMap<K, V>) -> Result<Vec<ChatMessage>>
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        self.turns
            .iter()
            .map(|(role, template)| {
                Ok(ChatMessage {
                    role: (*role).to_string(),
                    content: template.format(vars)?,
                })
            })
            .collect()
    }
}
