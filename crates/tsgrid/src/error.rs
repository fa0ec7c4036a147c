//! Error and Result types for tsgrid operations.

use chrono::NaiveDateTime;
use std::io;
use thiserror::Error;

/// A convenience `Result` type for tsgrid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// The error type for grid and block file operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// Interval base code or multiplier is not supported.
    #[error("Invalid interval: base {base}, multiplier {multiplier}")]
    InvalidInterval {
        /// Interval base (name or persisted code).
        base: String,
        /// Interval multiplier.
        multiplier: i64,
    },

    /// Period end lies before its start.
    #[error("Invalid period: end {end} is before start {start}")]
    InvalidPeriod {
        /// Start of the period (inclusive).
        start: NaiveDateTime,
        /// End of the period (inclusive).
        end: NaiveDateTime,
    },

    /// A resize was requested without a new start or end.
    #[error("Resize requires at least one of a new start or a new end")]
    MissingBound,

    /// A series operation needs a period of record that was never set.
    #[error("Period of record has not been set")]
    PeriodNotSet,

    /// A series index does not address one of the file's series.
    #[error("Series index {index} out of range for {count} series")]
    SeriesIndexOutOfRange {
        /// Requested series index.
        index: usize,
        /// Number of series in the file.
        count: usize,
    },

    /// The main header carries an unknown version marker.
    #[error("Unsupported version: {0:?}")]
    UnsupportedVersion(String),

    /// The file header or length does not describe a valid block file.
    #[error("Corrupt layout: {0}")]
    CorruptLayout(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
