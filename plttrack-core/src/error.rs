//! Error types for plttrack-core.

use crate::Channel;
use thiserror::Error;

/// Result type alias for plttrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for plttrack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A channel outside the configured channel universe was used.
    #[error("channel {0} is not configured")]
    UnknownChannel(Channel),

    /// No plane geometry exists for a configured channel.
    #[error("no alignment for channel {channel}, plane {plane}")]
    MissingAlignment { channel: Channel, plane: usize },

    /// Malformed row in the track calibration table.
    #[error("calibration line {line}: {message}")]
    Calibration { line: usize, message: String },

    /// Malformed row in a pixel mask file.
    #[error("pixel mask line {line}: {message}")]
    PixelMask { line: usize, message: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
