//! PDF text extraction via lopdf, one `PageText` per page.

use std::path::Path;

use super::{ExtractError, PageText, TextExtractor};

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| ExtractError::PdfProcessing(e.to_string()))?;

        let mut pages = Vec::new();
        for (page_number, _object_id) in doc.get_pages() {
            let text = doc.extract_text(&[page_number]).unwrap_or_else(|e| {
                // A single undecodable page should not sink the document.
                log::warn!(
                    "Failed to extract text from page {} of '{}': {}",
                    page_number,
                    crate::sanitize::redact_path(path),
                    e
                );
                String::new()
            });
            pages.push(PageText {
                page_number: page_number as usize,
                text,
            });
        }

        if pages.is_empty() {
            return Err(ExtractError::PdfProcessing(
                "document has no pages".to_string(),
            ));
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_really.pdf");
        std::fs::write(&path, b"plain text pretending to be a PDF").unwrap();

        let result = PdfExtractor.extract(&path);
        assert!(matches!(result, Err(ExtractError::PdfProcessing(_))));
    }

    #[test]
    fn test_missing_pdf_is_processing_error() {
        let result = PdfExtractor.extract(Path::new("/nonexistent/scope.pdf"));
        assert!(result.is_err());
    }
}
