//! Planes, telescopes and the per-event arena that owns them.
//!
//! Everything here lives for exactly one event. Tracks refer to clusters by
//! [`ClusterRef`] (plane index, cluster index) into their own telescope, so no
//! structure holds a reference into another.

use crate::track::{ClusterRef, Track};
use crate::{Channel, Cluster, Hit};
use serde::{Deserialize, Serialize};

/// One sensor plane of a telescope, as delivered by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PlaneRecord")]
pub struct Plane {
    /// All hits on the plane.
    pub hits: Vec<Hit>,
    /// Clusters of adjacent hits.
    pub clusters: Vec<Cluster>,
}

// Recorded events may omit `hits` when every hit belongs to a cluster.
#[derive(Deserialize)]
struct PlaneRecord {
    hits: Option<Vec<Hit>>,
    #[serde(default)]
    clusters: Vec<Cluster>,
}

impl From<PlaneRecord> for Plane {
    fn from(record: PlaneRecord) -> Self {
        match record.hits {
            Some(hits) => Self {
                hits,
                clusters: record.clusters,
            },
            None => Self::from_clusters(record.clusters),
        }
    }
}

impl Plane {
    /// Creates a plane with no hits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plane whose hits are exactly those of its clusters.
    #[must_use]
    pub fn from_clusters(clusters: Vec<Cluster>) -> Self {
        let hits = clusters.iter().flat_map(|c| c.iter().copied()).collect();
        Self { hits, clusters }
    }

    /// Number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    /// Number of clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Cluster by index.
    #[must_use]
    pub fn cluster(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }
}

/// One physical sensor stack on one readout channel, for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telescope {
    channel: Channel,
    planes: Vec<Plane>,
    #[serde(skip)]
    tracks: Vec<Track>,
}

impl Telescope {
    /// Creates a telescope. Plane order is fixed from here on.
    #[must_use]
    pub fn new(channel: Channel, planes: Vec<Plane>) -> Self {
        Self {
            channel,
            planes,
            tracks: Vec::new(),
        }
    }

    /// Readout channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Number of planes.
    #[must_use]
    pub fn n_planes(&self) -> usize {
        self.planes.len()
    }

    /// Plane by index.
    #[must_use]
    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    /// Planes in physical order.
    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Resolves a cluster handle.
    #[must_use]
    pub fn cluster(&self, handle: ClusterRef) -> Option<&Cluster> {
        self.planes.get(handle.plane)?.cluster(handle.cluster)
    }

    /// Total number of hits over all planes.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.planes.iter().map(Plane::n_hits).sum()
    }

    /// Number of planes with at least one hit.
    #[must_use]
    pub fn n_hit_planes(&self) -> usize {
        self.planes.iter().filter(|p| p.n_hits() > 0).count()
    }

    /// Total number of clusters over all planes.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.planes.iter().map(Plane::n_clusters).sum()
    }

    /// One cluster on every plane that has hits, and none elsewhere.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.n_hit_planes() == self.n_clusters()
    }

    /// Number of reconstructed tracks.
    #[must_use]
    pub fn n_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Track by index, in finder order.
    #[must_use]
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Reconstructed tracks in finder order.
    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Replaces all tracks.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }
}

/// Per-event arena holding every telescope of one bunch crossing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Telescopes read out in this crossing.
    pub telescopes: Vec<Telescope>,
}

impl Event {
    /// Creates an event from its telescopes.
    #[must_use]
    pub fn new(telescopes: Vec<Telescope>) -> Self {
        Self { telescopes }
    }

    /// Number of telescopes.
    #[must_use]
    pub fn n_telescopes(&self) -> usize {
        self.telescopes.len()
    }

    /// Telescope by index.
    #[must_use]
    pub fn telescope(&self, index: usize) -> Option<&Telescope> {
        self.telescopes.get(index)
    }
}
