//! Pixel and plane geometry.
//!
//! Three frames are involved:
//! - pixel: fractional `(column, row)` indices on the readout chip,
//! - local: centered on the sensor, in distance units (cm),
//! - telescope: the common frame of one sensor stack, `z` along the beam.

use serde::{Deserialize, Serialize};

/// Pixel matrix layout of a readout chip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelGeometry {
    /// Column pitch (local distance units per column).
    pub pitch_x: f64,
    /// Row pitch (local distance units per row).
    pub pitch_y: f64,
    /// Number of columns.
    pub columns: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Default for PixelGeometry {
    fn default() -> Self {
        // PSI46 readout chip: 52 x 80 pixels of 150 x 100 um.
        Self {
            pitch_x: 0.015,
            pitch_y: 0.01,
            columns: 52,
            rows: 80,
        }
    }
}

impl PixelGeometry {
    fn center(&self) -> (f64, f64) {
        (
            (f64::from(self.columns) - 1.0) / 2.0,
            (f64::from(self.rows) - 1.0) / 2.0,
        )
    }

    /// Local position of a (fractional) pixel position.
    #[inline]
    #[must_use]
    pub fn local_from_pixel(&self, column: f64, row: f64) -> (f64, f64) {
        let (cc, cr) = self.center();
        ((column - cc) * self.pitch_x, (row - cr) * self.pitch_y)
    }

    /// Fractional pixel position of a local position.
    #[inline]
    #[must_use]
    pub fn pixel_from_local(&self, lx: f64, ly: f64) -> (f64, f64) {
        let (cc, cr) = self.center();
        (lx / self.pitch_x + cc, ly / self.pitch_y + cr)
    }

    /// Converts a local displacement into a displacement in pixel units.
    #[inline]
    #[must_use]
    pub fn pixel_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.pitch_x, dy / self.pitch_y)
    }

    /// Returns an error message when the layout cannot be used.
    ///
    /// # Errors
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let positive = |pitch: f64| pitch.is_finite() && pitch > 0.0;
        if !positive(self.pitch_x) || !positive(self.pitch_y) {
            return Err(format!(
                "pixel pitch must be positive, got ({}, {})",
                self.pitch_x, self.pitch_y
            ));
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(format!(
                "pixel matrix must be non-empty, got {}x{}",
                self.columns, self.rows
            ));
        }
        Ok(())
    }
}

/// Placement of one plane inside its telescope.
///
/// local -> telescope: rotate by `rotation` radians, then translate by `(x, y)`;
/// the plane sits at depth `z`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneGeometry {
    /// In-plane rotation (radians).
    pub rotation: f64,
    /// Translation along x.
    pub x: f64,
    /// Translation along y.
    pub y: f64,
    /// Depth along the beam axis.
    pub z: f64,
}

impl PlaneGeometry {
    /// Unrotated plane centered on the beam axis at depth `z`.
    #[must_use]
    pub fn at_depth(z: f64) -> Self {
        Self {
            z,
            ..Self::default()
        }
    }

    /// Telescope-frame point of a local position on this plane.
    #[inline]
    #[must_use]
    pub fn to_telescope(&self, lx: f64, ly: f64) -> [f64; 3] {
        let (sin, cos) = self.rotation.sin_cos();
        [
            cos * lx - sin * ly + self.x,
            sin * lx + cos * ly + self.y,
            self.z,
        ]
    }

    /// Local position of a telescope-frame `(x, y)` on this plane.
    #[inline]
    #[must_use]
    pub fn to_local(&self, tx: f64, ty: f64) -> (f64, f64) {
        let (sin, cos) = self.rotation.sin_cos();
        let (dx, dy) = (tx - self.x, ty - self.y);
        (cos * dx + sin * dy, -sin * dx + cos * dy)
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Sub-area of a plane accepted for measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiducialRegion {
    /// Every position, including outside the pixel matrix.
    All,
    /// The pixel matrix itself.
    #[default]
    FullSensor,
    /// Inclusive column/row window.
    Window {
        /// First accepted column.
        column_min: u16,
        /// Last accepted column.
        column_max: u16,
        /// First accepted row.
        row_min: u16,
        /// Last accepted row.
        row_max: u16,
    },
}

impl FiducialRegion {
    /// Whether a fractional pixel position falls inside the region.
    ///
    /// Positions are rounded to the nearest pixel; non-finite positions are
    /// never inside.
    #[must_use]
    pub fn contains(&self, column: f64, row: f64, pixels: &PixelGeometry) -> bool {
        if !column.is_finite() || !row.is_finite() {
            return false;
        }
        let (c, r) = (column.round(), row.round());
        match *self {
            Self::All => true,
            Self::FullSensor => {
                c >= 0.0
                    && r >= 0.0
                    && c <= f64::from(pixels.columns) - 1.0
                    && r <= f64::from(pixels.rows) - 1.0
            }
            Self::Window {
                column_min,
                column_max,
                row_min,
                row_max,
            } => {
                c >= f64::from(column_min)
                    && c <= f64::from(column_max)
                    && r >= f64::from(row_min)
                    && r <= f64::from(row_max)
            }
        }
    }
}
