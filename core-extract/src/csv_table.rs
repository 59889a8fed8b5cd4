//! CSV rendered as an aligned text table.
//!
//! The header row comes first, every column is right-aligned to its widest
//! cell and columns are separated by two spaces. Ragged rows are accepted;
//! missing cells render empty.

use crate::error::{ExtractError, Result};
use crate::extractor::TextExtractor;
use crate::plain::decode_utf8_ignoring_invalid;

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExtractor;

impl TextExtractor for CsvExtractor {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| ExtractError::Parse {
                format: "csv",
                reason: e.to_string(),
            })?;
            rows.push(
                record
                    .iter()
                    .map(|field| decode_utf8_ignoring_invalid(field).trim().to_string())
                    .collect(),
            );
        }

        Ok(render_table(&rows))
    }
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            (0..columns)
                .map(|i| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{:>width$}", cell, width = widths[i])
                })
                .collect::<Vec<_>>()
                .join(COLUMN_GAP)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
