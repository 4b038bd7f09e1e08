//! PDF page text extraction.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::error::DocumentReadError;
use crate::segment::PageText;

static BLANK_RUNS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Anything that turns a source document into page texts.
pub trait DocumentReader {
    fn read(&self, bytes: &[u8]) -> Result<Vec<PageText>, DocumentReadError>;

    fn read_file(&self, path: &Path) -> Result<Vec<PageText>, DocumentReadError> {
        let bytes = std::fs::read(path)?;
        self.read(&bytes)
    }
}

/// Reads PDFs with `pdf-extract`, one text blob per page.
pub struct PdfReader;

impl DocumentReader for PdfReader {
    fn read(&self, bytes: &[u8]) -> Result<Vec<PageText>, DocumentReadError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| DocumentReadError::Pdf(e.to_string()))?;
        if pages.is_empty() {
            return Err(DocumentReadError::NoPages);
        }
        info!("Extracted {} pages", pages.len());
        Ok(pages.iter().map(|p| clean_page(p)).collect())
    }
}

/// Normalise line endings and collapse long runs of blank lines.
fn clean_page(text: &str) -> PageText {
    let normalized = text.replace("\r\n", "\n");
    BLANK_RUNS_RE.replace_all(&normalized, "\n\n").to_string()
}
