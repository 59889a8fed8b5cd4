use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::extractor::TextExtractor;

/// Text layer of every page via `pdf-extract`.
///
/// Scanned PDFs without a text layer yield an empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let raw = pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Parse {
            format: "pdf",
            reason: e.to_string(),
        })?;

        // Page breaks come through as form feeds
        let text = raw.replace('\u{c}', "\n");
        debug!(chars = text.len(), "Extracted PDF text layer");
        Ok(text)
    }
}
