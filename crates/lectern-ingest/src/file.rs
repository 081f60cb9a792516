//! File text extraction for local sources.

use std::path::Path;

use lectern_core::{Error, Result};
use tracing::{debug, warn};

/// Supported file types for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Html,
    Pdf,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Self::PlainText,
            "md" | "mdx" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

/// Extract text content from a file.
///
/// Fails with [`Error::Load`] when the path is missing or unreadable.
pub fn extract_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::Load(format!("file not found: {}", path.display())));
    }

    match FileType::from_path(path) {
        FileType::Pdf => extract_pdf(path),
        FileType::Html => {
            let html = read_to_string(path)?;
            Ok(crate::web::html_to_text(&html))
        }
        FileType::PlainText | FileType::Markdown | FileType::Unknown => read_to_string(path),
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Load(format!("cannot read {}: {}", path.display(), e)))
}

/// Extract the text of every page, pages separated by a blank line.
fn extract_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::Load(format!("cannot open PDF {}: {}", path.display(), e)))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in &page_numbers {
        match doc.extract_text(&[*number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => warn!("Skipping page {} of {}: {}", number, path.display(), e),
        }
    }

    debug!(
        "Extracted {} of {} pages from {}",
        pages.len(),
        page_numbers.len(),
        path.display()
    );
    Ok(pages.join("\n\n"))
}
