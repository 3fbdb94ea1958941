//! Pixel hit types for telescope planes.

use serde::{Deserialize, Serialize};

/// Pixel coordinate on a readout chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    /// Column index.
    pub column: u16,
    /// Row index.
    pub row: u16,
}

impl PixelCoord {
    /// Creates a new pixel coordinate.
    #[inline]
    #[must_use]
    pub fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }
}

/// A single fired pixel as delivered by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Column index.
    pub column: u16,
    /// Row index.
    pub row: u16,
    /// Calibrated charge; zero when no gain calibration was applied.
    #[serde(default)]
    pub charge: f64,
}

impl Hit {
    /// Creates a hit with the given charge.
    #[inline]
    #[must_use]
    pub fn new(column: u16, row: u16, charge: f64) -> Self {
        Self {
            column,
            row,
            charge,
        }
    }

    /// Creates a hit without charge information.
    #[inline]
    #[must_use]
    pub fn at(column: u16, row: u16) -> Self {
        Self::new(column, row, 0.0)
    }
}
