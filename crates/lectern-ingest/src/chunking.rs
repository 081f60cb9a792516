//! Text chunking with paragraph-first splitting and character overlap.
//!
//! Chunks are packed from whole paragraphs (`"\n\n"`-terminated segments)
//! up to `chunk_size` characters. A paragraph longer than the window is hard
//! sliced by character count. Every chunk after the first repeats the last
//! `chunk_overlap` characters of its predecessor. A paragraph break only
//! ends a chunk if the chunk reaches past that overlap; otherwise the next
//! chunk would start where this one does and swallow it whole.
//!
//! All sizes are counted in `char`s.

use lectern_core::{Error, Result};

use crate::types::{Chunk, Document};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Preferred split point.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Char-indexed window over a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    overlap: usize,
}

/// Splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Requires `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "invalid chunking parameters: chunk_size={}, overlap={}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split one document. An empty document yields no chunks.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let offsets = char_offsets(&doc.text);
        let byte_at = |pos: usize| offsets.get(pos).copied().unwrap_or(doc.text.len());

        self.spans(&doc.text, &offsets)
            .into_iter()
            .enumerate()
            .map(|(i, span)| Chunk {
                text: doc.text[byte_at(span.start)..byte_at(span.end)].to_string(),
                overlap_with_previous: span.overlap,
                source_ref: doc.locator.clone(),
                chunk_index: i,
                char_start: span.start,
            })
            .collect()
    }

    /// Split every document, preserving document order.
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.split_document(d)).collect()
    }

    fn spans(&self, text: &str, offsets: &[usize]) -> Vec<Span> {
        let total = offsets.len();
        if total == 0 {
            return Vec::new();
        }

        let sep_chars = PARAGRAPH_SEPARATOR.chars().count();
        let breaks: Vec<usize> = text
            .match_indices(PARAGRAPH_SEPARATOR)
            .map(|(byte, _)| offsets.partition_point(|&o| o < byte) + sep_chars)
            .collect();

        let mut spans = Vec::new();
        let mut start = 0;
        let mut overlap = 0;
        let mut covered = 0;

        loop {
            let limit = start + self.chunk_size;
            let end = if limit >= total {
                total
            } else {
                breaks
                    .iter()
                    .rev()
                    .copied()
                    .find(|&b| b > covered && b <= limit && b - start > self.chunk_overlap)
                    .unwrap_or(limit)
            };

            spans.push(Span {
                start,
                end,
                overlap,
            });
            if end == total {
                break;
            }

            overlap = self.chunk_overlap.min(end - start);
            start = end - overlap;
            covered = end;
        }

        spans
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Byte offset of every char in `text`.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).collect()
}

/// Rebuild document text from its chunks by dropping each declared overlap.
pub fn reassemble(chunks: &[Chunk]) -> String {
    chunks.iter().map(Chunk::fresh_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::SourceKind;

    fn doc(text: &str) -> Document {
        Document::new(text, SourceKind::File, "test.txt")
    }

    fn sample_corpus() -> String {
        let mut text = String::new();
        for i in 0..12 {
            text.push_str(&format!(
                "Paragraph {} describes the faculty of science at the University of Bamenda. ",
                i
            ));
            text.push_str(&"Students attend lectures on campus. ".repeat(i % 4 + 1));
            text.push_str("\n\n");
        }
        // One paragraph much longer than a chunk forces a hard slice.
        text.push_str(&"Tuition fees are payable each semester. ".repeat(60));
        text.push_str("\n\nClosing remarks with accents: École, Mbí, naïve.");
        text
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split_document(&doc("Hello, world!"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].overlap_with_previous, 0);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_document(&doc("")).is_empty());
    }

    #[test]
    fn test_reassembly_reproduces_document() {
        let text = sample_corpus();
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_document(&doc(&text));

        assert!(chunks.len() > 2);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = sample_corpus();
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_document(&doc(&text));

        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.text.chars().count() <= 1000);
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.source_ref, "test.txt");
            if i == 0 {
                assert_eq!(chunk.overlap_with_previous, 0);
                continue;
            }
            let prev: Vec<char> = chunks[i - 1].text.chars().collect();
            let head: String = chunk.text.chars().take(chunk.overlap_with_previous).collect();
            let tail: String = prev[prev.len() - chunk.overlap_with_previous..].iter().collect();
            assert_eq!(head, tail);
            assert!(chunk.overlap_with_previous <= 200);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let para = format!("{}\n\n", "a".repeat(298));
        let text = para.repeat(5);
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_document(&doc(&text));

        // Three 300-char paragraphs fit in the first window.
        assert_eq!(chunks[0].text.chars().count(), 900);
        assert!(chunks[0].text.ends_with(PARAGRAPH_SEPARATOR));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_hard_slices_long_paragraph() {
        let text = "x".repeat(2500);
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_document(&doc(&text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 1000);
        assert_eq!(chunks[1].char_start, 800);
        assert_eq!(chunks[1].overlap_with_previous, 200);
        assert_eq!(reassemble(&chunks), text);
    }

    fn assert_no_chunk_inside_successor(chunks: &[Chunk]) {
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_end = a.char_start + a.text.chars().count();
            let b_end = b.char_start + b.text.chars().count();
            assert!(
                b.char_start > a.char_start && b_end > a_end,
                "chunk {} at {}..{} lies inside chunk {} at {}..{}",
                a.chunk_index,
                a.char_start,
                a_end,
                b.chunk_index,
                b.char_start,
                b_end
            );
        }
    }

    #[test]
    fn test_short_heading_before_long_paragraph_is_not_repeated() {
        let text = format!("{}\n\n{}", "a".repeat(50), "b".repeat(1500));
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_document(&doc(&text));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].char_start, 800);
        assert_no_chunk_inside_successor(&chunks);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_mixed_paragraph_lengths_never_nest_chunks() {
        let mut text = String::new();
        for i in 0..40 {
            let len = [12, 180, 1300, 45, 600, 3][i % 6];
            text.push_str(&"word ".repeat(len / 5 + 1));
            text.push_str("\n\n");
        }
        for (size, overlap) in [(1000, 200), (300, 100), (120, 100)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split_document(&doc(&text));
            assert_no_chunk_inside_successor(&chunks);
            assert_eq!(reassemble(&chunks), text);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = sample_corpus();
        let splitter = TextSplitter::new(400, 50).unwrap();
        let first = splitter.split_documents(&[doc(&text), doc("other")]);
        let second = splitter.split_documents(&[doc("other"), doc(&text)]);

        let from_first: Vec<_> = first.iter().filter(|c| c.text != "other").collect();
        let from_second: Vec<_> = second.iter().filter(|c| c.text != "other").collect();
        assert_eq!(from_first, from_second);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 0).is_ok());
    }
}
