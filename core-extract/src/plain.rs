use crate::error::Result;
use crate::extractor::TextExtractor;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// UTF-8 text, invalid byte sequences dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(decode_utf8_ignoring_invalid(bytes))
    }
}

/// Decode UTF-8, skipping invalid sequences instead of replacing them.
///
/// A leading byte-order mark is removed.
pub fn decode_utf8_ignoring_invalid(bytes: &[u8]) -> String {
    let mut input = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut out = String::with_capacity(input.len());

    loop {
        match std::str::from_utf8(input) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, rest) = input.split_at(e.valid_up_to());
                // valid_up_to marks a clean char boundary
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => input = &rest[len..],
                    // Truncated sequence at the end
                    None => break,
                }
            }
        }
    }

    out
}
