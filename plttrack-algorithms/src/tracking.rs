//! Combinatorial track finding with overlap resolution.
//!
//! Seeds are every pairing of one cluster on plane 0 with one cluster on
//! plane 1. Each seed is extrapolated to plane 2 and scored by D2, the squared
//! pixel distance to the nearest plane-2 cluster; matched seeds are refit
//! through all three clusters. Candidates are then accepted greedily by
//! ascending D2 so that no cluster is shared between accepted tracks.

use plttrack_core::{Alignment, Channel, ClusterRef, Telescope, Track, UNMATCHED_D2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Track finding strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingAlgorithm {
    /// Leave the track list empty.
    NoTracking,
    /// All plane-0 x plane-1 seeds, matched to plane 2.
    #[default]
    AllCombinations01to2,
}

/// Builds the track list of a telescope.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrackFinder {
    algorithm: TrackingAlgorithm,
}

impl TrackFinder {
    /// Create a finder for the given algorithm.
    #[must_use]
    pub fn new(algorithm: TrackingAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> TrackingAlgorithm {
        self.algorithm
    }

    /// Replaces the telescope's tracks with freshly found ones.
    pub fn run<A: Alignment + ?Sized>(&self, telescope: &mut Telescope, alignment: &A) {
        let tracks = self.find(telescope, alignment);
        telescope.set_tracks(tracks);
    }

    /// Finds non-overlapping tracks, best D2 first.
    #[must_use]
    pub fn find<A: Alignment + ?Sized>(&self, telescope: &Telescope, alignment: &A) -> Vec<Track> {
        match self.algorithm {
            TrackingAlgorithm::NoTracking => Vec::new(),
            TrackingAlgorithm::AllCombinations01to2 => {
                resolve_overlaps(all_combinations_01_to_2(telescope, alignment))
            }
        }
    }
}

/// Candidate tracks from every plane-0/plane-1 seed, scored against plane 2.
#[must_use]
pub fn all_combinations_01_to_2<A: Alignment + ?Sized>(
    telescope: &Telescope,
    alignment: &A,
) -> Vec<Track> {
    let (Some(first), Some(second)) = (telescope.plane(0), telescope.plane(1)) else {
        return Vec::new();
    };
    let channel = telescope.channel();

    let mut candidates = Vec::with_capacity(first.n_clusters() * second.n_clusters());
    for i0 in 0..first.n_clusters() {
        for i1 in 0..second.n_clusters() {
            let seed_refs = [ClusterRef::new(0, i0), ClusterRef::new(1, i1)];
            let Some(seed) = Track::fit(channel, telescope, &seed_refs, alignment) else {
                continue;
            };
            let track = match nearest_cluster(&seed, channel, 2, telescope, alignment) {
                Some((i2, d2)) => {
                    let refs = [seed_refs[0], seed_refs[1], ClusterRef::new(2, i2)];
                    Track::fit(channel, telescope, &refs, alignment).map(|t| t.with_d2(d2))
                }
                None => Some(seed.with_d2(UNMATCHED_D2)),
            };
            candidates.extend(track);
        }
    }
    candidates
}

/// Index and D2 of the plane cluster closest to the track's crossing point.
fn nearest_cluster<A: Alignment + ?Sized>(
    track: &Track,
    channel: Channel,
    plane: usize,
    telescope: &Telescope,
    alignment: &A,
) -> Option<(usize, f64)> {
    let clusters = &telescope.plane(plane)?.clusters;
    clusters
        .iter()
        .enumerate()
        .filter_map(|(i, cluster)| {
            let (dx, dy) = track.residual_to(channel, plane, cluster, alignment)?;
            let (dc, dr) = alignment.pixels().pixel_distance(dx, dy);
            let d2 = dc * dc + dr * dr;
            d2.is_finite().then_some((i, d2))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Greedy lowest-D2 selection of tracks that share no cluster.
///
/// The sort is stable, so candidates with equal D2 keep their input order.
#[must_use]
pub fn resolve_overlaps(mut candidates: Vec<Track>) -> Vec<Track> {
    candidates.sort_by(|a, b| a.d2.total_cmp(&b.d2));

    let mut claimed: HashSet<ClusterRef> = HashSet::new();
    let mut accepted = Vec::new();
    for track in candidates {
        if track.clusters.iter().any(|c| claimed.contains(c)) {
            continue;
        }
        claimed.extend(track.clusters.iter().copied());
        accepted.push(track);
    }
    accepted
}
