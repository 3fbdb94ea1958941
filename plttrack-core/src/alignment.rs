//! Alignment service: plane placement and pixel layout per channel.
//!
//! The analysis only reads alignment. [`Alignment`] is the seam a host can
//! implement over its own calibration store; [`AlignmentTable`] is the
//! JSON-backed implementation used by the tools in this workspace.
//!
//! JSON schema:
//!
//! ```json
//! {
//!   "pixel": { "pitch_x": 0.015, "pitch_y": 0.01, "columns": 52, "rows": 80 },
//!   "channels": [
//!     { "channel": 5, "planes": [ { "rotation": 0.0, "x": 0.0, "y": 0.0, "z": 0.0 }, ... ] }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::geometry::{PixelGeometry, PlaneGeometry};
use crate::{Channel, Cluster, PLANES_PER_TELESCOPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read-only geometry lookup keyed by `(channel, plane)`.
pub trait Alignment {
    /// Placement of a plane, if known.
    fn plane(&self, channel: Channel, plane: usize) -> Option<&PlaneGeometry>;

    /// Pixel layout shared by all planes.
    fn pixels(&self) -> &PixelGeometry;

    /// Like [`Alignment::plane`] but reports a missing entry as an error.
    fn require_plane(&self, channel: Channel, plane: usize) -> Result<&PlaneGeometry> {
        self.plane(channel, plane)
            .ok_or(Error::MissingAlignment { channel, plane })
    }

    /// Local position of a cluster centroid.
    fn cluster_local(&self, cluster: &Cluster) -> Option<(f64, f64)> {
        let (column, row) = cluster.centroid()?;
        Some(self.pixels().local_from_pixel(column, row))
    }

    /// Telescope-frame position of a cluster centroid on the given plane.
    fn cluster_point(&self, channel: Channel, plane: usize, cluster: &Cluster) -> Option<[f64; 3]> {
        let geometry = self.plane(channel, plane)?;
        let (lx, ly) = self.cluster_local(cluster)?;
        Some(geometry.to_telescope(lx, ly))
    }
}

/// Alignment constants loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct AlignmentTable {
    pixels: PixelGeometry,
    planes: HashMap<Channel, Vec<PlaneGeometry>>,
}

#[derive(Deserialize)]
struct JsonAlignment {
    #[serde(default)]
    pixel: PixelGeometry,
    #[serde(default)]
    channels: Vec<JsonChannel>,
}

#[derive(Deserialize)]
struct JsonChannel {
    channel: Channel,
    planes: Vec<PlaneGeometry>,
}

impl AlignmentTable {
    /// Creates an empty table with the given pixel layout.
    #[must_use]
    pub fn new(pixels: PixelGeometry) -> Self {
        Self {
            pixels,
            planes: HashMap::new(),
        }
    }

    /// Ideal telescopes: unrotated, centered planes spaced `spacing` apart in z.
    #[must_use]
    pub fn nominal(channels: &[Channel], spacing: f64) -> Self {
        let mut table = Self::new(PixelGeometry::default());
        for &channel in channels {
            #[allow(clippy::cast_precision_loss)]
            let planes = (0..PLANES_PER_TELESCOPE)
                .map(|i| PlaneGeometry::at_depth(i as f64 * spacing))
                .collect();
            table.planes.insert(channel, planes);
        }
        table
    }

    /// Sets the planes of one channel, replacing any previous entry.
    pub fn insert(&mut self, channel: Channel, planes: Vec<PlaneGeometry>) {
        self.planes.insert(channel, planes);
    }

    /// Channels with alignment entries, ascending.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.planes.keys().copied().collect();
        channels.sort_unstable();
        channels
    }

    /// Number of planes known for a channel.
    #[must_use]
    pub fn plane_count(&self, channel: Channel) -> usize {
        self.planes.get(&channel).map_or(0, Vec::len)
    }

    /// Load alignment from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let json: JsonAlignment = serde_json::from_reader(BufReader::new(file))?;
        Self::from_json_alignment(json)
    }

    /// Load alignment from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the text is not valid JSON or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonAlignment = serde_json::from_str(json)?;
        Self::from_json_alignment(json)
    }

    fn from_json_alignment(json: JsonAlignment) -> Result<Self> {
        json.pixel.validate().map_err(Error::Config)?;

        let mut table = Self::new(json.pixel);
        for entry in json.channels {
            if table.planes.contains_key(&entry.channel) {
                return Err(Error::Config(format!(
                    "channel {} listed twice in alignment",
                    entry.channel
                )));
            }
            if entry.planes.len() != PLANES_PER_TELESCOPE {
                return Err(Error::Config(format!(
                    "channel {} has {} planes, expected {}",
                    entry.channel,
                    entry.planes.len(),
                    PLANES_PER_TELESCOPE
                )));
            }
            if let Some(plane) = entry.planes.iter().position(|p| !p.is_finite()) {
                return Err(Error::Config(format!(
                    "channel {} plane {} has non-finite constants",
                    entry.channel, plane
                )));
            }
            table.planes.insert(entry.channel, entry.planes);
        }
        Ok(table)
    }
}

impl Alignment for AlignmentTable {
    fn plane(&self, channel: Channel, plane: usize) -> Option<&PlaneGeometry> {
        self.planes.get(&channel)?.get(plane)
    }

    fn pixels(&self) -> &PixelGeometry {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hit;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_json_loading() {
        let json = r#"{
            "pixel": { "pitch_x": 0.015, "pitch_y": 0.01, "columns": 52, "rows": 80 },
            "channels": [
                {
                    "channel": 5,
                    "planes": [
                        { "z": 0.0 },
                        { "x": 0.02, "z": 3.77 },
                        { "rotation": 0.01, "y": -0.01, "z": 7.54 }
                    ]
                }
            ]
        }"#;

        let table = AlignmentTable::from_json(json).expect("alignment should parse");
        assert_eq!(table.channels(), vec![5]);
        assert_eq!(table.plane_count(5), 3);

        let plane = table.plane(5, 1).unwrap();
        assert_abs_diff_eq!(plane.x, 0.02);
        assert_abs_diff_eq!(plane.z, 3.77);
        assert!(table.plane(5, 3).is_none());
        assert!(table.plane(6, 0).is_none());
    }

    #[test]
    fn test_missing_pixel_section_uses_defaults() {
        let json = r#"{ "channels": [] }"#;
        let table = AlignmentTable::from_json(json).unwrap();
        assert_eq!(*table.pixels(), PixelGeometry::default());
    }

    #[test]
    fn test_rejects_wrong_plane_count() {
        let json = r#"{ "channels": [ { "channel": 2, "planes": [ { "z": 0.0 } ] } ] }"#;
        let err = AlignmentTable::from_json(json).unwrap_err().to_string();
        assert!(err.contains("expected 3"), "unexpected error: {err}");
    }

    #[test]
    fn test_rejects_duplicate_channel() {
        let json = r#"{ "channels": [
            { "channel": 2, "planes": [ {}, {}, {} ] },
            { "channel": 2, "planes": [ {}, {}, {} ] }
        ] }"#;
        assert!(AlignmentTable::from_json(json).is_err());
    }

    #[test]
    fn test_require_plane_reports_missing_entry() {
        let table = AlignmentTable::nominal(&[4], 3.77);
        assert!(table.require_plane(4, 2).is_ok());
        assert!(matches!(
            table.require_plane(9, 0),
            Err(Error::MissingAlignment { channel: 9, plane: 0 })
        ));
    }

    #[test]
    fn test_cluster_point_on_nominal_plane() {
        let table = AlignmentTable::nominal(&[4], 3.77);
        let cluster: Cluster = std::iter::once(Hit::at(26, 40)).collect();
        let [x, y, z] = table.cluster_point(4, 2, &cluster).unwrap();
        assert_abs_diff_eq!(x, 0.5 * 0.015, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 0.5 * 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(z, 7.54, epsilon = 1e-12);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "channels": [ {{ "channel": 13, "planes": [ {{}}, {{ "z": 1.0 }}, {{ "z": 2.0 }} ] }} ] }}"#
        )
        .unwrap();
        let table = AlignmentTable::from_file(file.path()).unwrap();
        assert_eq!(table.channels(), vec![13]);
    }
}
