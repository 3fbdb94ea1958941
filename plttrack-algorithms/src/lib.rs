//! plttrack-algorithms: Track finding and telescope statistics.
//!
//! This crate provides the analysis layer on top of `plttrack-core`:
//! - **Tracking** - all plane-0/plane-1 seeds matched to plane 2, greedy overlap resolution
//! - **Tag-and-probe** - per-plane efficiency with a warm-up exclusion window
//! - **Accidentals** - calibrated classification of three-hit tracks
//! - **Zero counting** - real tracks per bunch crossing
//!
#![warn(missing_docs)]

mod analyzer;
mod calibration;
mod config;
mod counters;
pub mod tracking;

pub use analyzer::EventAnalyzer;
pub use calibration::{CalibrationTable, Gaussian, TrackCalibration};
pub use config::{AnalyzerConfig, SlopeWindow};
pub use counters::{AccidentalCounter, ChannelCounters, ChannelReport, EffCounter};
pub use tracking::{TrackFinder, TrackingAlgorithm};
