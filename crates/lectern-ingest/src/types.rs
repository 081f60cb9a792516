//! Document and chunk types shared by the loader, chunker, and index.

use serde::{Deserialize, Serialize};

use lectern_core::SourceKind;

/// A unit of ingested source text plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: SourceKind,
    /// Path, URL, or query the text was fetched with.
    pub locator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: SourceKind, locator: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source,
            locator: locator.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A bounded slice of a document's text, the unit of retrieval.
///
/// The first `overlap_with_previous` characters of `text` repeat the tail of
/// the previous chunk from the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub overlap_with_previous: usize,
    /// Locator of the owning document.
    pub source_ref: String,
    pub chunk_index: usize,
    /// Character offset of `text` within the document.
    pub char_start: usize,
}

impl Chunk {
    /// The part of `text` not shared with the previous chunk.
    pub fn fresh_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap_with_previous) {
            Some((byte, _)) => &self.text[byte..],
            None => "",
        }
    }
}
