//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recorded event that does not decode.
    #[error("invalid event record on line {line}: {source}")]
    Record {
        /// 1-based line number in the event file.
        line: usize,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// Report rows that do not match the run's header.
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] plttrack_core::Error),
}
