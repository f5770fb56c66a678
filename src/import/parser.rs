//! Reads raw CSV bytes into headers and rows.

use crate::model::RawRow;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tracing::{debug, trace};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A CSV line that could not be read. These are collected rather than returned as errors so that
/// one bad line does not stop the rest of the file from being imported.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ParseError {
    /// 1-based line number in the file, when the reader knows it.
    pub line: Option<u64>,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<csv::Error> for ParseError {
    fn from(e: csv::Error) -> Self {
        Self {
            line: e.position().map(|p| p.line()),
            message: e.to_string(),
        }
    }
}

/// The result of reading a CSV file.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub errors: Vec<ParseError>,
}

impl ParsedCsv {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Reads `bytes` as CSV with the first record as the header row.
///
/// - Headers and cells are trimmed.
/// - Blank lines, and lines whose cells are all empty, are skipped.
/// - A record with a different number of fields than the header, or with invalid UTF-8, is
///   skipped and reported in `errors`.
pub fn parse(bytes: &[u8]) -> ParsedCsv {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(str::to_string).collect(),
        Err(e) => {
            debug!("Unable to read the CSV header row: {e}");
            return ParsedCsv {
                errors: vec![e.into()],
                ..ParsedCsv::default()
            };
        }
    };

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    trace!("Skipping empty record at {:?}", record.position());
                    continue;
                }
                rows.push(
                    headers
                        .iter()
                        .map(String::as_str)
                        .zip(record.iter())
                        .collect::<RawRow>(),
                );
            }
            Err(e) => {
                let error = ParseError::from(e);
                debug!("Skipping unreadable CSV record: {error}");
                errors.push(error);
            }
        }
    }

    debug!(
        "Parsed {} headers, {} rows, {} errors",
        headers.len(),
        rows.len(),
        errors.len()
    );
    ParsedCsv {
        headers,
        rows,
        errors,
    }
}
