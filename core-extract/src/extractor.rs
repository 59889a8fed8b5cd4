//! Extractor trait shared by every content type.

use crate::error::Result;

/// Turns raw file bytes into searchable text.
///
/// Implementations are stateless apart from construction-time settings and
/// are shared across worker threads, so `extract` takes `&self` and must not
/// block on async work. Callers run it on the blocking pool.
pub trait TextExtractor: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    /// Extract text from the complete file content
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}
