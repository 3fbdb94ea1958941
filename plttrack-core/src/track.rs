//! Straight-line tracks through telescope planes.

use crate::alignment::Alignment;
use crate::geometry::FiducialRegion;
use crate::mask::PixelMask;
use crate::telescope::Telescope;
use crate::{Channel, Cluster, PixelCoord};

/// Quality score of a track with no plane-2 match.
///
/// Any matched candidate sorts before it.
pub const UNMATCHED_D2: f64 = f64::INFINITY;

/// Handle to a cluster within one telescope of the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterRef {
    /// Plane index inside the telescope.
    pub plane: usize,
    /// Cluster index inside the plane.
    pub cluster: usize,
}

impl ClusterRef {
    /// Creates a new handle.
    #[must_use]
    pub fn new(plane: usize, cluster: usize) -> Self {
        Self { plane, cluster }
    }
}

/// Local residual of a contributing cluster: cluster minus track projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneResidual {
    /// Plane the residual was measured on.
    pub plane: usize,
    /// Cluster minus track position along x (local frame).
    pub x: f64,
    /// Cluster minus track position along y (local frame).
    pub y: f64,
}

/// A 2- or 3-hit linear trajectory in the telescope frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Contributing clusters, one per plane.
    pub clusters: Vec<ClusterRef>,
    /// Point on the line (centroid of the fitted points).
    pub origin: [f64; 3],
    /// Direction `(vx, vy, vz)`; not normalized.
    pub direction: [f64; 3],
    /// Local residuals of the contributing clusters.
    pub residuals: Vec<PlaneResidual>,
    /// Candidate quality score, lower is better.
    pub d2: f64,
}

impl Track {
    /// Builds a track from explicit line parameters, without residuals.
    #[must_use]
    pub fn from_line(clusters: Vec<ClusterRef>, origin: [f64; 3], direction: [f64; 3]) -> Self {
        Self {
            clusters,
            origin,
            direction,
            residuals: Vec::new(),
            d2: UNMATCHED_D2,
        }
    }

    /// Least-squares line through the telescope-frame centroids of the given
    /// clusters.
    ///
    /// `None` when fewer than two clusters resolve or a cluster has no
    /// alignment. Points sharing one `z` give a degenerate track, see
    /// [`Track::is_degenerate`].
    pub fn fit<A: Alignment + ?Sized>(
        channel: Channel,
        telescope: &Telescope,
        clusters: &[ClusterRef],
        alignment: &A,
    ) -> Option<Self> {
        if clusters.len() < 2 {
            return None;
        }
        let mut points = Vec::with_capacity(clusters.len());
        for &handle in clusters {
            let cluster = telescope.cluster(handle)?;
            points.push(alignment.cluster_point(channel, handle.plane, cluster)?);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let mut origin = [0.0; 3];
        for p in &points {
            for (o, v) in origin.iter_mut().zip(p) {
                *o += v / n;
            }
        }
        let mut direction = [0.0; 3];
        for p in &points {
            let dz = p[2] - origin[2];
            direction[0] += dz * (p[0] - origin[0]);
            direction[1] += dz * (p[1] - origin[1]);
            direction[2] += dz * dz;
        }

        let mut track = Self::from_line(clusters.to_vec(), origin, direction);
        for &handle in clusters {
            let cluster = telescope.cluster(handle)?;
            let (x, y) = track.residual_to(channel, handle.plane, cluster, alignment)?;
            track.residuals.push(PlaneResidual {
                plane: handle.plane,
                x,
                y,
            });
        }
        Some(track)
    }

    /// Sets the quality score.
    #[must_use]
    pub fn with_d2(mut self, d2: f64) -> Self {
        self.d2 = d2;
        self
    }

    /// Number of contributing clusters.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.clusters.len()
    }

    /// `dx/dz`.
    #[must_use]
    pub fn slope_x(&self) -> f64 {
        self.direction[0] / self.direction[2]
    }

    /// `dy/dz`.
    #[must_use]
    pub fn slope_y(&self) -> f64 {
        self.direction[1] / self.direction[2]
    }

    /// True when either slope is not a finite number.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !self.slope_x().is_finite() || !self.slope_y().is_finite()
    }

    /// Whether the track uses the given cluster.
    #[must_use]
    pub fn uses(&self, handle: ClusterRef) -> bool {
        self.clusters.contains(&handle)
    }

    /// Telescope-frame `(x, y)` where the track crosses depth `z`.
    #[must_use]
    pub fn position_at(&self, z: f64) -> (f64, f64) {
        let t = (z - self.origin[2]) / self.direction[2];
        (
            self.origin[0] + self.direction[0] * t,
            self.origin[1] + self.direction[1] * t,
        )
    }

    /// Stored local residual on a contributing plane.
    #[must_use]
    pub fn local_residual(&self, plane: usize) -> Option<(f64, f64)> {
        self.residuals
            .iter()
            .find(|r| r.plane == plane)
            .map(|r| (r.x, r.y))
    }

    /// Local position where the track crosses a plane.
    pub fn projected_local<A: Alignment + ?Sized>(
        &self,
        channel: Channel,
        plane: usize,
        alignment: &A,
    ) -> Option<(f64, f64)> {
        let geometry = alignment.plane(channel, plane)?;
        let (x, y) = self.position_at(geometry.z);
        Some(geometry.to_local(x, y))
    }

    /// Fractional pixel position where the track crosses a plane.
    pub fn projected_pixel<A: Alignment + ?Sized>(
        &self,
        channel: Channel,
        plane: usize,
        alignment: &A,
    ) -> Option<(f64, f64)> {
        let (lx, ly) = self.projected_local(channel, plane, alignment)?;
        Some(alignment.pixels().pixel_from_local(lx, ly))
    }

    /// Local residual of any cluster on a plane relative to this track.
    pub fn residual_to<A: Alignment + ?Sized>(
        &self,
        channel: Channel,
        plane: usize,
        cluster: &Cluster,
        alignment: &A,
    ) -> Option<(f64, f64)> {
        let (px, py) = self.projected_local(channel, plane, alignment)?;
        let (cx, cy) = alignment.cluster_local(cluster)?;
        Some((cx - px, cy - py))
    }

    /// Whether the track crosses the plane inside the fiducial region and
    /// on an unmasked pixel.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn is_fiducial<A: Alignment + ?Sized>(
        &self,
        channel: Channel,
        plane: usize,
        alignment: &A,
        region: &FiducialRegion,
        mask: &PixelMask,
    ) -> bool {
        let Some((column, row)) = self.projected_pixel(channel, plane, alignment) else {
            return false;
        };
        if !region.contains(column, row, alignment.pixels()) {
            return false;
        }
        let (c, r) = (column.round(), row.round());
        let limit = f64::from(u16::MAX);
        if c < 0.0 || r < 0.0 || c > limit || r > limit {
            return true;
        }
        !mask.contains(channel, plane, PixelCoord::new(c as u16, r as u16))
    }
}
