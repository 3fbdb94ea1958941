//! Analyzer configuration.

use crate::tracking::TrackingAlgorithm;
use plttrack_core::{Error, FiducialRegion, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Open interval `(center - half_width, center + half_width)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlopeWindow {
    /// Middle of the window.
    pub center: f64,
    /// Half of the window width.
    pub half_width: f64,
}

impl SlopeWindow {
    /// Creates a window.
    #[must_use]
    pub fn new(center: f64, half_width: f64) -> Self {
        Self { center, half_width }
    }

    /// Lower edge (excluded).
    #[must_use]
    pub fn low(&self) -> f64 {
        self.center - self.half_width
    }

    /// Upper edge (excluded).
    #[must_use]
    pub fn high(&self) -> f64 {
        self.center + self.half_width
    }

    /// Strictly inside the window; NaN never is.
    #[inline]
    #[must_use]
    pub fn contains(&self, slope: f64) -> bool {
        slope > self.low() && slope < self.high()
    }
}

/// Selection cuts and bookkeeping parameters of the event analyzer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Probe match tolerance (pixels, Euclidean).
    pub pixel_distance: f64,
    /// Accepted two-hit slope dx/dz.
    pub slope_x: SlopeWindow,
    /// Accepted two-hit slope dy/dz.
    pub slope_y: SlopeWindow,
    /// Crossings counted as warm-up and excluded from reported efficiency.
    pub warmup_crossings: u64,
    /// Combined slope deviation (sigmas) above which a track may be accidental.
    pub accidental_slope_threshold: f64,
    /// Residual deviation (sigmas) every plane must stay below.
    pub accidental_residual_threshold: f64,
    /// Region where a probe crossing is measurable.
    pub fiducial_region: FiducialRegion,
    /// Track finder used for the accidental analysis.
    pub tracking: TrackingAlgorithm,
    /// Keep per-channel two- and three-hit track slopes.
    pub record_slopes: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            pixel_distance: 5.0,
            slope_x: SlopeWindow::new(0.0, 0.01),
            slope_y: SlopeWindow::new(0.027, 0.01),
            warmup_crossings: 10_000_000,
            accidental_slope_threshold: 5.0,
            accidental_residual_threshold: 5.0,
            fiducial_region: FiducialRegion::FullSensor,
            tracking: TrackingAlgorithm::AllCombinations01to2,
            record_slopes: false,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a configuration with the reference cuts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probe match tolerance.
    #[must_use]
    pub fn with_pixel_distance(mut self, pixels: f64) -> Self {
        self.pixel_distance = pixels;
        self
    }

    /// Set the slope windows.
    #[must_use]
    pub fn with_slope_windows(mut self, x: SlopeWindow, y: SlopeWindow) -> Self {
        self.slope_x = x;
        self.slope_y = y;
        self
    }

    /// Set the warm-up length in crossings.
    #[must_use]
    pub fn with_warmup_crossings(mut self, crossings: u64) -> Self {
        self.warmup_crossings = crossings;
        self
    }

    /// Set the fiducial region.
    #[must_use]
    pub fn with_fiducial_region(mut self, region: FiducialRegion) -> Self {
        self.fiducial_region = region;
        self
    }

    /// Set the track finder.
    #[must_use]
    pub fn with_tracking(mut self, tracking: TrackingAlgorithm) -> Self {
        self.tracking = tracking;
        self
    }

    /// Enable or disable slope recording.
    #[must_use]
    pub fn with_record_slopes(mut self, record: bool) -> Self {
        self.record_slopes = record;
        self
    }

    /// Load from a JSON file; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds invalid cuts.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON string; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the text is not valid JSON or holds invalid cuts.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects cuts that cannot select anything meaningful.
    ///
    /// # Errors
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.pixel_distance.is_finite() || self.pixel_distance < 0.0 {
            return Err(Error::Config(format!(
                "pixel_distance must be a non-negative number, got {}",
                self.pixel_distance
            )));
        }
        for (name, window) in [("slope_x", &self.slope_x), ("slope_y", &self.slope_y)] {
            if !window.center.is_finite() || !window.half_width.is_finite() || window.half_width <= 0.0
            {
                return Err(Error::Config(format!(
                    "{name} window must have a finite center and positive half width"
                )));
            }
        }
        for (name, threshold) in [
            ("accidental_slope_threshold", self.accidental_slope_threshold),
            ("accidental_residual_threshold", self.accidental_residual_threshold),
        ] {
            if !threshold.is_finite() {
                return Err(Error::Config(format!("{name} must be finite")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_cuts() {
        let config = AnalyzerConfig::default();
        assert!((config.slope_x.low() + 0.01).abs() < 1e-12);
        assert!((config.slope_y.high() - 0.037).abs() < 1e-12);
        assert_eq!(config.warmup_crossings, 10_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_is_open() {
        let window = SlopeWindow::new(0.0, 0.01);
        assert!(window.contains(0.0099));
        assert!(!window.contains(0.01));
        assert!(!window.contains(-0.01));
        assert!(!window.contains(f64::NAN));
    }

    #[test]
    fn test_partial_json() {
        let config = AnalyzerConfig::from_json(
            r#"{ "warmup_crossings": 1000, "fiducial_region": "all", "tracking": "no_tracking" }"#,
        )
        .unwrap();
        assert_eq!(config.warmup_crossings, 1000);
        assert_eq!(config.fiducial_region, FiducialRegion::All);
        assert_eq!(config.tracking, TrackingAlgorithm::NoTracking);
        assert!((config.pixel_distance - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_bad_window() {
        let json = r#"{ "slope_x": { "center": 0.0, "half_width": -1.0 } }"#;
        assert!(AnalyzerConfig::from_json(json).is_err());
        let config = AnalyzerConfig::new().with_pixel_distance(-1.0);
        assert!(config.validate().is_err());
    }
}
