//! Document text extraction.
//!
//! Converts an uploaded scope document into page-indexed plain text. The
//! pipeline only depends on the `TextExtractor` trait; the registry
//! dispatches to a concrete extractor by MIME type.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod pdf;
pub mod text;

pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

/// Errors from document extraction. Classified as a generation-stage
/// failure by the orchestrator.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Document '{path}' contains no extractable text")]
    EmptyDocument { path: PathBuf },
}

/// One page of extracted text. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Extracts page-indexed plain text from a document on disk.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractError>;
}

/// Dispatches to the right extractor by MIME type.
pub struct ExtractorRegistry {
    text: PlainTextExtractor,
    pdf: PdfExtractor,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            text: PlainTextExtractor,
            pdf: PdfExtractor,
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for ExtractorRegistry {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_default();

        let pages = match mime.as_str() {
            "application/pdf" => self.pdf.extract(path)?,
            m if m.starts_with("text/") => self.text.extract(path)?,
            // Markdown and friends sometimes resolve to application types.
            "application/json" | "application/xml" => self.text.extract(path)?,
            other => {
                return Err(ExtractError::UnsupportedFormat(if other.is_empty() {
                    format!("unknown extension on '{}'", crate::sanitize::redact_path(path))
                } else {
                    other.to_string()
                }))
            }
        };

        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(ExtractError::EmptyDocument {
                path: path.to_path_buf(),
            });
        }
        Ok(pages)
    }
}
