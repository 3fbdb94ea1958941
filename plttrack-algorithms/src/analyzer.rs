//! Per-event orchestration and statistics.
//!
//! [`EventAnalyzer`] owns every running counter. The host calls
//! [`EventAnalyzer::analyze_event`] once per bunch crossing and pulls the
//! ratios whenever it wants to publish. There is no internal locking: a host
//! reading from another thread must serialize access itself.

use crate::calibration::CalibrationTable;
use crate::config::AnalyzerConfig;
use crate::counters::{ChannelCounters, ChannelReport};
use crate::tracking::TrackFinder;
use plttrack_core::{
    Alignment, AlignmentTable, Channel, ClusterRef, Error, Event, PixelMask, Result, Telescope,
    Track, PLANES_PER_TELESCOPE,
};
use std::collections::BTreeMap;

/// Tag-and-probe and accidental-rate accumulator.
pub struct EventAnalyzer<A: Alignment = AlignmentTable> {
    config: AnalyzerConfig,
    alignment: A,
    calibration: CalibrationTable,
    mask: PixelMask,
    finder: TrackFinder,
    bx_counter: u64,
    channels: BTreeMap<Channel, ChannelCounters>,
}

impl<A: Alignment> EventAnalyzer<A> {
    /// Creates an analyzer for a fixed channel universe.
    ///
    /// # Errors
    /// Fails when the configuration is invalid or a channel lacks alignment
    /// for one of its planes.
    pub fn new(
        config: AnalyzerConfig,
        alignment: A,
        calibration: CalibrationTable,
        channels: &[Channel],
    ) -> Result<Self> {
        config.validate()?;
        for &channel in channels {
            for plane in 0..PLANES_PER_TELESCOPE {
                alignment.require_plane(channel, plane)?;
            }
        }

        let uncalibrated: Vec<Channel> = channels
            .iter()
            .copied()
            .filter(|&c| !calibration.contains(c))
            .collect();
        if !uncalibrated.is_empty() {
            log::warn!(
                "no track calibration for channels {uncalibrated:?}; accidental rates stay at zero for them"
            );
        }

        let channels: BTreeMap<Channel, ChannelCounters> = channels
            .iter()
            .map(|&c| (c, ChannelCounters::default()))
            .collect();
        log::info!(
            "event analyzer ready: {} channels, warm-up {} crossings, tracking {:?}",
            channels.len(),
            config.warmup_crossings,
            config.tracking
        );

        Ok(Self {
            finder: TrackFinder::new(config.tracking),
            config,
            alignment,
            calibration,
            mask: PixelMask::new(),
            bx_counter: 0,
            channels,
        })
    }

    /// Use an online pixel mask for the fiducial test.
    #[must_use]
    pub fn with_pixel_mask(mut self, mask: PixelMask) -> Self {
        self.mask = mask;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Alignment service.
    #[must_use]
    pub fn alignment(&self) -> &A {
        &self.alignment
    }

    /// Calibration table.
    #[must_use]
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Crossings analyzed since construction or the last reset.
    #[must_use]
    pub fn bx_counter(&self) -> u64 {
        self.bx_counter
    }

    /// Configured channels, ascending.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels.keys().copied()
    }

    /// Raw counters of a channel.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the channel is not configured.
    pub fn counters(&self, channel: Channel) -> Result<&ChannelCounters> {
        self.channels
            .get(&channel)
            .ok_or(Error::UnknownChannel(channel))
    }

    fn counters_mut(&mut self, channel: Channel) -> Result<&mut ChannelCounters> {
        self.channels
            .get_mut(&channel)
            .ok_or(Error::UnknownChannel(channel))
    }

    fn in_warmup(&self) -> bool {
        self.bx_counter <= self.config.warmup_crossings
    }

    /// Folds one bunch crossing into the counters.
    ///
    /// Telescopes that are not clean, have fewer than two hit planes or are
    /// not shaped like a telescope contribute nothing.
    ///
    /// # Errors
    /// `UnknownChannel` if any telescope belongs to an unconfigured channel;
    /// nothing is counted for such an event.
    pub fn analyze_event(&mut self, event: &mut Event) -> Result<()> {
        if let Some(t) = event
            .telescopes
            .iter()
            .find(|t| !self.channels.contains_key(&t.channel()))
        {
            return Err(Error::UnknownChannel(t.channel()));
        }

        self.bx_counter += 1;

        for telescope in &mut event.telescopes {
            if telescope.n_planes() != PLANES_PER_TELESCOPE {
                log::debug!(
                    "channel {}: skipping telescope with {} planes",
                    telescope.channel(),
                    telescope.n_planes()
                );
                continue;
            }
            if telescope.n_hit_planes() < 2 || !telescope.is_clean() {
                continue;
            }

            for probe in 0..PLANES_PER_TELESCOPE {
                self.calculate_telescope_rates(probe, telescope)?;
            }

            if telescope.n_hit_planes() == PLANES_PER_TELESCOPE {
                self.finder.run(telescope, &self.alignment);
                self.calculate_accidental_rates(telescope)?;
            }
        }
        Ok(())
    }

    /// Tag-and-probe pass with `probe` as the probed plane.
    ///
    /// The first clusters of the two other planes form a two-hit track. If it
    /// crosses the probe plane inside the fiducial region with slopes inside
    /// both windows, the probe denominator is counted; if the probe plane's
    /// first cluster lies within `pixel_distance` of the crossing, so is the
    /// numerator. Warm-up crossings are counted in the warm-up counter too.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the telescope's channel is not configured.
    pub fn calculate_telescope_rates(&mut self, probe: usize, telescope: &Telescope) -> Result<()> {
        let channel = telescope.channel();
        if !self.channels.contains_key(&channel) {
            return Err(Error::UnknownChannel(channel));
        }
        let tags = match probe {
            0 => [1, 2],
            1 => [0, 2],
            2 => [0, 1],
            _ => return Ok(()),
        };
        let has_cluster = |plane: usize| telescope.plane(plane).is_some_and(|p| p.n_clusters() > 0);
        if !tags.iter().all(|&t| has_cluster(t)) {
            return Ok(());
        }

        let refs = [ClusterRef::new(tags[0], 0), ClusterRef::new(tags[1], 0)];
        let Some(track) = Track::fit(channel, telescope, &refs, &self.alignment) else {
            return Ok(());
        };
        let slopes = (track.slope_x(), track.slope_y());

        let passes = track.is_fiducial(
            channel,
            probe,
            &self.alignment,
            &self.config.fiducial_region,
            &self.mask,
        ) && track.n_hits() == 2
            && self.config.slope_x.contains(slopes.0)
            && self.config.slope_y.contains(slopes.1);

        let matched = passes
            && telescope
                .plane(probe)
                .and_then(|p| p.cluster(0))
                .and_then(|c| track.residual_to(channel, probe, c, &self.alignment))
                .is_some_and(|(dx, dy)| {
                    let (dc, dr) = self.alignment.pixels().pixel_distance(dx, dy);
                    dc.hypot(dr) <= self.config.pixel_distance
                });

        let warmup = self.in_warmup();
        let record = self.config.record_slopes;
        let counters = self.counters_mut(channel)?;
        if record {
            counters.two_hit_slopes.push(slopes);
        }
        if !passes {
            return Ok(());
        }

        counters.total.denominator[probe] += 1;
        if warmup {
            counters.warmup.denominator[probe] += 1;
        }
        if matched {
            counters.total.numerator[probe] += 1;
            if warmup {
                counters.warmup.numerator[probe] += 1;
            }
        }
        Ok(())
    }

    /// Classifies the telescope's first track as accidental or real.
    ///
    /// Only the first track in finder order is looked at. A track with a
    /// non-finite slope, or a channel without calibration, is skipped. The
    /// track is accidental when its combined slope deviation exceeds the
    /// slope threshold while every per-plane residual deviation stays below
    /// the residual threshold. Residual deviations are signed: large negative
    /// deviations pass.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the telescope's channel is not configured.
    pub fn calculate_accidental_rates(&mut self, telescope: &Telescope) -> Result<()> {
        let channel = telescope.channel();
        if !self.channels.contains_key(&channel) {
            return Err(Error::UnknownChannel(channel));
        }
        let Some(track) = telescope.track(0) else {
            return Ok(());
        };
        let (slope_x, slope_y) = (track.slope_x(), track.slope_y());
        if !slope_x.is_finite() || !slope_y.is_finite() {
            return Ok(());
        }
        let Some(calibration) = self.calibration.get(channel) else {
            return Ok(());
        };

        let slope_deviation = calibration
            .slope_x
            .deviation(slope_x)
            .abs()
            .hypot(calibration.slope_y.deviation(slope_y).abs());

        let mut residuals_within = true;
        for plane in 0..PLANES_PER_TELESCOPE {
            let Some((rx, ry)) = track.local_residual(plane) else {
                return Ok(());
            };
            let dx = calibration.residual_x[plane].deviation(rx);
            let dy = calibration.residual_y[plane].deviation(ry);
            residuals_within &= dx < self.config.accidental_residual_threshold
                && dy < self.config.accidental_residual_threshold;
        }
        let accidental =
            slope_deviation > self.config.accidental_slope_threshold && residuals_within;

        let record = self.config.record_slopes;
        let counters = self.counters_mut(channel)?;
        if accidental {
            counters.accidentals.accidental += 1;
        } else {
            counters.accidentals.classified += 1;
        }
        if record {
            counters.three_hit_slopes.push((slope_x, slope_y));
        }
        Ok(())
    }

    /// Per-plane efficiency of a channel, warm-up excluded.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the channel is not configured.
    pub fn telescope_efficiency(&self, channel: Channel) -> Result<[f64; PLANES_PER_TELESCOPE]> {
        Ok(self.counters(channel)?.efficiency())
    }

    /// Accidental rate of a channel.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the channel is not configured.
    pub fn telescope_accidentals(&self, channel: Channel) -> Result<f64> {
        Ok(self.counters(channel)?.accidental_rate())
    }

    /// Zero-counting rate of a channel: real tracks per crossing.
    ///
    /// # Errors
    /// Returns `UnknownChannel` if the channel is not configured.
    pub fn zero_counting(&self, channel: Channel) -> Result<f64> {
        Ok(self.counters(channel)?.zero_counting(self.bx_counter))
    }

    /// Current values of every configured channel, ascending by channel.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChannelReport> {
        self.channels
            .iter()
            .map(|(&channel, counters)| ChannelReport {
                channel,
                efficiency: counters.efficiency(),
                accidental_rate: counters.accidental_rate(),
                zero_counting: counters.zero_counting(self.bx_counter),
            })
            .collect()
    }

    /// Zeroes every counter, recorded slopes and the crossing counter.
    pub fn reinitialize_counters(&mut self) {
        self.bx_counter = 0;
        for counters in self.channels.values_mut() {
            *counters = ChannelCounters::default();
        }
        log::info!("counters reinitialized for {} channels", self.channels.len());
    }
}
