//! plttrack-core: Data model and geometry for pixel-telescope track analysis.
//!
//! This crate provides the per-event model (telescopes, planes, clusters,
//! hits), straight-line tracks, and the read-only alignment service used to
//! move between pixel, local and telescope coordinates.
//!

pub mod alignment;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod mask;
pub mod telescope;
pub mod track;

pub use alignment::{Alignment, AlignmentTable};
pub use cluster::Cluster;
pub use error::{Error, Result};
pub use geometry::{FiducialRegion, PixelGeometry, PlaneGeometry};
pub use hit::{Hit, PixelCoord};
pub use mask::PixelMask;
pub use telescope::{Event, Plane, Telescope};
pub use track::{ClusterRef, PlaneResidual, Track, UNMATCHED_D2};

/// Readout channel identifier of a telescope.
pub type Channel = u32;

/// Planes per telescope in the reference geometry.
pub const PLANES_PER_TELESCOPE: usize = 3;
