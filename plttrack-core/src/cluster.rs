//! Clusters of adjacent hits.

use crate::Hit;
use serde::{Deserialize, Serialize};

/// A group of adjacent hits produced by the external clustering step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Hits belonging to this cluster.
    pub hits: Vec<Hit>,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self { hits: Vec::new() }
    }

    /// Creates a cluster with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Adds a hit to the cluster.
    pub fn push(&mut self, hit: Hit) {
        self.hits.push(hit);
    }

    /// Returns the number of hits in the cluster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    /// Centroid in fractional pixel units `(column, row)`.
    ///
    /// Charge-weighted when the summed charge is positive, otherwise the plain
    /// mean of the hit coordinates. `None` for an empty cluster.
    #[must_use]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.hits.is_empty() {
            return None;
        }
        let total_charge: f64 = self.hits.iter().map(|h| h.charge).sum();
        let (weights, norm) = if total_charge > 0.0 {
            (true, total_charge)
        } else {
            #[allow(clippy::cast_precision_loss)]
            (false, self.hits.len() as f64)
        };

        let (mut sc, mut sr) = (0.0, 0.0);
        for hit in &self.hits {
            let w = if weights { hit.charge } else { 1.0 };
            sc += w * f64::from(hit.column);
            sr += w * f64::from(hit.row);
        }
        Some((sc / norm, sr / norm))
    }
}

impl FromIterator<Hit> for Cluster {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cluster_operations() {
        let mut cluster = Cluster::with_capacity(4);
        assert!(cluster.is_empty());
        assert!(cluster.centroid().is_none());

        cluster.push(Hit::at(10, 20));
        cluster.push(Hit::at(11, 20));
        cluster.push(Hit::at(10, 21));

        assert_eq!(cluster.len(), 3);
        assert_eq!(cluster.iter().count(), 3);
    }

    #[test]
    fn test_unweighted_centroid() {
        let cluster: Cluster = [Hit::at(10, 20), Hit::at(12, 22)].into_iter().collect();
        let (c, r) = cluster.centroid().unwrap();
        assert_relative_eq!(c, 11.0);
        assert_relative_eq!(r, 21.0);
    }

    #[test]
    fn test_charge_weighted_centroid() {
        let cluster: Cluster = [Hit::new(10, 20, 3.0), Hit::new(14, 20, 1.0)]
            .into_iter()
            .collect();
        let (c, r) = cluster.centroid().unwrap();
        assert_relative_eq!(c, 11.0);
        assert_relative_eq!(r, 20.0);
    }
}
