//! Persisted trade-result files.
//!
//! A results file is a JSON array of trade records, optionally preceded by
//! free-form diagnostic lines (validation summaries, progress output). All
//! lines before the first line starting with `[` are skipped.

use std::path::{Path, PathBuf};

use thiserror::Error;
use gaplab_core::domain::Trade;

#[derive(Debug, Error)]
pub enum ResultsFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no JSON array found (no line starts with '[')")]
    NoJsonArray,
    #[error("malformed trade records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Byte offset of the first line whose trimmed text starts with `[`.
fn json_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with('[') {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Parse the contents of a results file.
pub fn parse_trades(text: &str) -> Result<Vec<Trade>, ResultsFileError> {
    let start = json_start(text).ok_or(ResultsFileError::NoJsonArray)?;
    Ok(serde_json::from_str(&text[start..])?)
}

/// Read and parse a results file.
pub fn read_trades(path: &Path) -> Result<Vec<Trade>, ResultsFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| ResultsFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trades(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaplab_core::domain::ExitReason;

    #[test]
    fn skips_diagnostic_preamble() {
        let text = "Validation summary\n  3 trades checked\n  0 errors\n\n[\n  {\"ticker\":\"MU\",\"date\":\"2025-10-23\",\"entryTime\":\"10:05\",\"entryPrice\":210.5,\"exitReason\":\"target\",\"pnlPercent\":4.0}\n]\n";
        let trades = parse_trades(text).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, Some(ExitReason::Target));
    }

    #[test]
    fn plain_array_parses() {
        let trades = parse_trades("[]").unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn missing_array_is_an_error() {
        assert!(matches!(
            parse_trades("only diagnostics\n"),
            Err(ResultsFileError::NoJsonArray)
        ));
    }

    #[test]
    fn malformed_records_are_an_error() {
        assert!(matches!(
            parse_trades("[{\"ticker\": 5}]"),
            Err(ResultsFileError::Json(_))
        ));
    }
}
