//! Keyword allow-list gate for in-domain questions.

use lectern_core::GateSettings;

/// Admits a question when any configured keyword occurs in it,
/// case-insensitively. An empty keyword list admits nothing.
#[derive(Debug, Clone)]
pub struct TopicGate {
    keywords: Vec<String>,
}

impl TopicGate {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn from_settings(settings: &GateSettings) -> Self {
        Self::new(&settings.keywords)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn admit(&self, question: &str) -> bool {
        self.matched_keyword(question).is_some()
    }

    /// First keyword found in `question`, if any.
    pub fn matched_keyword(&self, question: &str) -> Option<&str> {
        let q = question.to_lowercase();
        self.keywords
            .iter()
            .find(|k| q.contains(k.as_str()))
            .map(String::as_str)
    }
}
