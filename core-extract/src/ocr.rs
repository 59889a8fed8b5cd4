//! Image OCR through the `tesseract` command-line tool.
//!
//! The image is decoded first so corrupt uploads fail fast without spawning a
//! process, then re-encoded as grayscale PNG into a temporary file that
//! tesseract reads. Recognized text is taken from stdout.

use image::ImageFormat;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::extractor::TextExtractor;

/// Tesseract invocation settings
#[derive(Debug, Clone)]
pub struct OcrSettings {
    /// Binary name or path
    pub tesseract_path: PathBuf,
    /// Language pack, e.g. `eng` or `eng+deu`
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OcrExtractor {
    settings: OcrSettings,
}

impl OcrExtractor {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    fn recognize(&self, image_path: &std::path::Path) -> Result<String> {
        let output = Command::new(&self.settings.tesseract_path)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.settings.language)
            .output()
            .map_err(|e| {
                ExtractError::Ocr(format!(
                    "failed to run {}: {}",
                    self.settings.tesseract_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextExtractor for OcrExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let image = image::load_from_memory(bytes)?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Decoded image for OCR"
        );

        let normalized = image.grayscale();
        let file = tempfile::Builder::new()
            .prefix("drive-search-ocr-")
            .suffix(".png")
            .tempfile()?;
        normalized.save_with_format(file.path(), ImageFormat::Png)?;

        let text = self.recognize(file.path())?;
        Ok(text.trim_end().to_string())
    }
}
