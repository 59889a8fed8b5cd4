//! # Text Extraction
//!
//! Converts downloaded file content into searchable text, one extractor per
//! content type:
//!
//! | Content type      | Extractor              | Backend            |
//! |-------------------|------------------------|--------------------|
//! | `text/plain`      | [`PlainTextExtractor`] | UTF-8 decode       |
//! | `text/csv`        | [`CsvExtractor`]       | `csv`              |
//! | `application/pdf` | [`PdfExtractor`]       | `pdf-extract`      |
//! | `image/png`, `image/jpeg` | [`OcrExtractor`] | `image` + `tesseract` |
//!
//! Extraction is CPU-bound and synchronous; run it on the blocking pool.
//!
//! ## Usage
//!
//! ```ignore
//! use core_extract::{ExtractorRegistry, OcrSettings};
//!
//! let registry = ExtractorRegistry::with_defaults(OcrSettings::default());
//! let text = registry.extract("text/csv", &bytes);
//! ```

pub mod csv_table;
pub mod error;
pub mod extractor;
pub mod ocr;
pub mod pdf;
pub mod plain;
pub mod registry;

pub use csv_table::CsvExtractor;
pub use error::{ExtractError, Result};
pub use extractor::TextExtractor;
pub use ocr::{OcrExtractor, OcrSettings};
pub use pdf::PdfExtractor;
pub use plain::PlainTextExtractor;
pub use registry::ExtractorRegistry;
