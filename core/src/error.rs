//! Error types for CSV exchange.
//!
//! Row-level problems never abort an import; they are collected into the
//! report. Only [`ImportError`] ends an import early.

use thiserror::Error;

/// Why a single CSV data row was skipped. `row` is the 0-based line index,
/// so the first data row after the header is row 1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Row {row}: Invalid format")]
    InvalidFormat { row: usize },

    #[error("Row {row}: Unknown measurement type '{name}'")]
    UnknownType { row: usize, name: String },

    #[error("Row {row}: Invalid date/time format")]
    InvalidDateTime { row: usize },

    #[error("Row {row}: Invalid value '{raw}'")]
    InvalidValue { row: usize, raw: String },
}

impl RowError {
    #[must_use]
    pub fn row(&self) -> usize {
        match self {
            Self::InvalidFormat { row }
            | Self::UnknownType { row, .. }
            | Self::InvalidDateTime { row }
            | Self::InvalidValue { row, .. } => *row,
        }
    }
}

/// Failures that end an import as a whole.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV file is empty")]
    Empty,

    #[error("Error reading CSV: {0}")]
    SourceRead(#[from] std::io::Error),

    #[error("Error saving imported measurements: {0:#}")]
    Commit(anyhow::Error),
}

/// Failures producing or writing an export payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
