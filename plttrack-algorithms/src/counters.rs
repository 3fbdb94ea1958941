//! Running per-channel counters and the ratios derived from them.

use plttrack_core::{Channel, PLANES_PER_TELESCOPE};
use serde::Serialize;

/// Tag-and-probe counts per plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EffCounter {
    /// Probe opportunities with a matching probe cluster.
    pub numerator: [u64; PLANES_PER_TELESCOPE],
    /// Probe opportunities passing the quality gate.
    pub denominator: [u64; PLANES_PER_TELESCOPE],
}

/// Three-hit track classification counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccidentalCounter {
    /// Tracks classified accidental.
    pub accidental: u64,
    /// Tracks classified as real crossings.
    pub classified: u64,
}

/// Everything accumulated for one channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChannelCounters {
    /// Lifetime tag-and-probe counts.
    pub total: EffCounter,
    /// Tag-and-probe counts from the warm-up crossings only.
    pub warmup: EffCounter,
    /// Three-hit track classification.
    pub accidentals: AccidentalCounter,
    /// `(dx/dz, dy/dz)` of every two-hit tag track, when recording.
    pub two_hit_slopes: Vec<(f64, f64)>,
    /// `(dx/dz, dy/dz)` of every classified three-hit track, when recording.
    pub three_hit_slopes: Vec<(f64, f64)>,
}

impl ChannelCounters {
    /// Per-plane efficiency with the warm-up window excluded; 0 without data.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn efficiency(&self) -> [f64; PLANES_PER_TELESCOPE] {
        let mut eff = [0.0; PLANES_PER_TELESCOPE];
        for (i, e) in eff.iter_mut().enumerate() {
            let denom = self.total.denominator[i].saturating_sub(self.warmup.denominator[i]);
            if denom > 0 {
                let numer = self.total.numerator[i].saturating_sub(self.warmup.numerator[i]);
                *e = numer as f64 / denom as f64;
            }
        }
        eff
    }

    /// `accidental / (classified + classified)`; 0 without classified tracks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accidental_rate(&self) -> f64 {
        let AccidentalCounter {
            accidental,
            classified,
        } = self.accidentals;
        if classified > 0 {
            accidental as f64 / (classified as f64 + classified as f64)
        } else {
            0.0
        }
    }

    /// `classified / crossings`; 0 before the first crossing.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn zero_counting(&self, crossings: u64) -> f64 {
        if crossings > 0 {
            self.accidentals.classified as f64 / crossings as f64
        } else {
            0.0
        }
    }
}

/// Reported values of one channel at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChannelReport {
    /// Readout channel.
    pub channel: Channel,
    /// Per-plane efficiency, warm-up excluded.
    pub efficiency: [f64; PLANES_PER_TELESCOPE],
    /// Accidental fraction.
    pub accidental_rate: f64,
    /// Real tracks per crossing.
    pub zero_counting: f64,
}
