//! Plain-text extraction. The whole file becomes a single page.

use std::path::Path;

use super::{ExtractError, PageText, TextExtractor};

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let text = std::fs::read_to_string(path).map_err(|e| ExtractError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(vec![PageText {
            page_number: 1,
            text,
        }])
    }
}
