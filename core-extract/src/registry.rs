//! Content type to extractor mapping.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::csv_table::CsvExtractor;
use crate::error::ExtractError;
use crate::extractor::TextExtractor;
use crate::ocr::{OcrExtractor, OcrSettings};
use crate::pdf::PdfExtractor;
use crate::plain::PlainTextExtractor;

/// Immutable registry built once at startup and shared via `Arc`.
///
/// [`extract`](ExtractorRegistry::extract) never fails: extractor errors and
/// panics degrade to empty content so the file is still indexed by name.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain text, CSV, PDF, and PNG/JPEG OCR
    pub fn with_defaults(ocr: OcrSettings) -> Self {
        let ocr: Arc<dyn TextExtractor> = Arc::new(OcrExtractor::new(ocr));

        Self::new()
            .register("text/plain", Arc::new(PlainTextExtractor))
            .register("text/csv", Arc::new(CsvExtractor))
            .register("application/pdf", Arc::new(PdfExtractor))
            .register("image/png", ocr.clone())
            .register("image/jpeg", ocr)
    }

    /// Add or replace the extractor for a content type
    pub fn register(
        mut self,
        content_type: impl Into<String>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        self.extractors.insert(content_type.into(), extractor);
        self
    }

    pub fn supports(&self, content_type: &str) -> bool {
        self.extractors.contains_key(content_type)
    }

    /// Registered content types, sorted
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.extractors.keys().cloned().collect();
        types.sort();
        types
    }

    /// Extract text, degrading every failure to an empty string
    pub fn extract(&self, content_type: &str, bytes: &[u8]) -> String {
        let Some(extractor) = self.extractors.get(content_type) else {
            warn!(content_type, "No extractor registered for content type");
            return String::new();
        };

        match run_guarded(extractor.as_ref(), bytes) {
            Ok(text) => {
                debug!(
                    extractor = extractor.name(),
                    bytes = bytes.len(),
                    chars = text.len(),
                    "Extracted text"
                );
                text
            }
            Err(e) => {
                warn!(
                    extractor = extractor.name(),
                    content_type,
                    error = %e,
                    "Extraction failed, indexing with empty content"
                );
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

/// Parsers for untrusted input may panic on malformed data
fn run_guarded(
    extractor: &dyn TextExtractor,
    bytes: &[u8],
) -> std::result::Result<String, ExtractError> {
    match catch_unwind(AssertUnwindSafe(|| extractor.extract(bytes))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractError::Panicked(message))
        }
    }
}
