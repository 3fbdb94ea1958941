//! Per-channel track calibration: slope and residual distributions.
//!
//! Source format is a whitespace-delimited table. The first line is a header
//! and is skipped; every following non-blank line holds 17 fields:
//!
//! ```text
//! channel slopeXMean slopeXSigma slopeYMean slopeYSigma
//!         resXMean0 resXSigma0 resXMean1 resXSigma1 resXMean2 resXSigma2
//!         resYMean0 resYSigma0 resYMean1 resYSigma1 resYMean2 resYSigma2
//! ```

use plttrack_core::{Channel, Error, Result, PLANES_PER_TELESCOPE};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const FIELDS_PER_ROW: usize = 17;

/// Mean and width of a calibrated distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gaussian {
    /// Mean.
    pub mean: f64,
    /// Width.
    pub sigma: f64,
}

impl Gaussian {
    /// Creates a distribution.
    #[must_use]
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self { mean, sigma }
    }

    /// Signed distance from the mean in units of sigma.
    #[inline]
    #[must_use]
    pub fn deviation(&self, value: f64) -> f64 {
        (value - self.mean) / self.sigma
    }
}

/// Calibration of one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackCalibration {
    /// `dx/dz` of real three-hit tracks.
    pub slope_x: Gaussian,
    /// `dy/dz` of real three-hit tracks.
    pub slope_y: Gaussian,
    /// Local x residual per plane.
    pub residual_x: [Gaussian; PLANES_PER_TELESCOPE],
    /// Local y residual per plane.
    pub residual_y: [Gaussian; PLANES_PER_TELESCOPE],
}

/// Calibrations keyed by channel. Immutable once the analyzer owns it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationTable {
    entries: BTreeMap<Channel, TrackCalibration>,
}

impl CalibrationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the calibration of a channel.
    pub fn insert(&mut self, channel: Channel, calibration: TrackCalibration) {
        self.entries.insert(channel, calibration);
    }

    /// Calibration of a channel, if present.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&TrackCalibration> {
        self.entries.get(&channel)
    }

    /// Whether the channel has a calibration.
    #[must_use]
    pub fn contains(&self, channel: Channel) -> bool {
        self.entries.contains_key(&channel)
    }

    /// Number of calibrated channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no channel is calibrated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calibrated channels, ascending.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.entries.keys().copied()
    }

    /// Parses the table from text.
    ///
    /// # Errors
    /// Returns `Calibration` for the first malformed row.
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Reads and parses a calibration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses the table from a buffered reader.
    ///
    /// Any malformed row is a fatal error. A channel listed twice keeps its
    /// last row.
    ///
    /// # Errors
    /// Returns an error on read failure or for the first malformed row.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (channel, calibration) = parse_row(&line, index + 1)?;
            if table.entries.insert(channel, calibration).is_some() {
                log::warn!("calibration for channel {channel} redefined on line {}", index + 1);
            }
        }
        Ok(table)
    }
}

fn parse_row(line: &str, line_number: usize) -> Result<(Channel, TrackCalibration)> {
    let err = |message: String| Error::Calibration {
        line: line_number,
        message,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELDS_PER_ROW {
        return Err(err(format!(
            "expected {FIELDS_PER_ROW} fields, found {}",
            fields.len()
        )));
    }

    let channel = fields[0]
        .parse::<Channel>()
        .map_err(|e| err(format!("channel '{}': {e}", fields[0])))?;

    let mut values = [0.0_f64; FIELDS_PER_ROW - 1];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field
            .parse::<f64>()
            .map_err(|e| err(format!("value '{field}': {e}")))?;
    }

    let gaussian = |at: usize| Gaussian::new(values[at], values[at + 1]);
    Ok((
        channel,
        TrackCalibration {
            slope_x: gaussian(0),
            slope_y: gaussian(2),
            residual_x: [gaussian(4), gaussian(6), gaussian(8)],
            residual_y: [gaussian(10), gaussian(12), gaussian(14)],
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = "\
channel sxm sxs sym sys rx0m rx0s rx1m rx1s rx2m rx2s ry0m ry0s ry1m ry1s ry2m ry2s
5 0.001 0.002 0.027 0.003 0.1 1.0 0.2 2.0 0.3 3.0 -0.1 1.5 -0.2 2.5 -0.3 3.5
13 0 1 0 1 0 1 0 1 0 1 0 1 0 1 0 1
";

    #[test]
    fn test_parse_table() {
        let table = CalibrationTable::parse(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.channels().collect::<Vec<_>>(), vec![5, 13]);

        let cal = table.get(5).unwrap();
        assert_relative_eq!(cal.slope_x.mean, 0.001);
        assert_relative_eq!(cal.slope_x.sigma, 0.002);
        assert_relative_eq!(cal.slope_y.mean, 0.027);
        assert_relative_eq!(cal.residual_x[1].sigma, 2.0);
        assert_relative_eq!(cal.residual_x[2].mean, 0.3);
        assert_relative_eq!(cal.residual_y[0].sigma, 1.5);
        assert_relative_eq!(cal.residual_y[2].mean, -0.3);
        assert!(table.get(6).is_none());
    }

    #[test]
    fn test_header_only_is_empty() {
        let table = CalibrationTable::parse("channel ...\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_short_row_is_fatal() {
        let text = "header\n5 0 1 0 1\n";
        match CalibrationTable::parse(text) {
            Err(Error::Calibration { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("expected 17"), "{message}");
            }
            other => panic!("expected calibration error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_row_is_fatal() {
        let text = "header\n5 0 1 0 1 0 1 0 1 0 x 0 1 0 1 0 1\n";
        assert!(matches!(
            CalibrationTable::parse(text),
            Err(Error::Calibration { line: 2, .. })
        ));
    }

    #[test]
    fn test_deviation_is_signed() {
        let g = Gaussian::new(1.0, 0.5);
        assert_relative_eq!(g.deviation(2.0), 2.0);
        assert_relative_eq!(g.deviation(0.0), -2.0);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();
        let table = CalibrationTable::from_file(file.path()).unwrap();
        assert!(table.contains(13));
    }
}
