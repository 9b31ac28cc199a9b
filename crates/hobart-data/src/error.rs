//! Error types for data operations.

use crate::ingest::SeriesKind;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Parse error on line {line}: {reason}")]
    Parse {
        /// 1-based line number in the source file (header is line 1)
        line: usize,
        /// What could not be parsed
        reason: String,
    },

    /// A required column is absent from the header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Asset code is empty after normalization
    #[error("Invalid asset code: {0:?}")]
    InvalidCode(String),

    /// The same (date, code) pair was supplied twice
    #[error("Duplicate observation for {code} on {date}")]
    DuplicateObservation {
        /// Asset code (or index name)
        code: String,
        /// Observation date
        date: NaiveDate,
    },

    /// Content already parsed as a different kind of series
    #[error("Expected {expected:?} prices, content was already parsed as {found:?}")]
    KindMismatch {
        /// Kind requested by the caller
        expected: SeriesKind,
        /// Kind of the cached parse
        found: SeriesKind,
    },
}
