#![allow(clippy::uninlined_format_args)]
use approx::assert_relative_eq;
use plttrack_algorithms::{AnalyzerConfig, CalibrationTable, EventAnalyzer};
use plttrack_core::{AlignmentTable, Cluster, Event, FiducialRegion, Hit, PixelMask, Plane, Telescope};

const SPACING: f64 = 3.77;

fn assert_planes(actual: [f64; 3], expected: [f64; 3]) {
    for (a, e) in actual.into_iter().zip(expected) {
        assert_relative_eq!(a, e);
    }
}

const CALIBRATION: &str = "\
channel sxm sxs sym sys rx0m rx0s rx1m rx1s rx2m rx2s ry0m ry0s ry1m ry1s ry2m ry2s
5 0 0.001 0.0265 0.001 0 0.001 0 0.001 0 0.001 0 0.001 0 0.001 0 0.001
8 0 0.001 0.0265 0.001 0 0.001 0 0.001 0 0.001 0 0.001 0 0.001 0 0.001
";

fn cluster(column: u16, row: u16) -> Cluster {
    std::iter::once(Hit::at(column, row)).collect()
}

/// Single-cluster telescope stepping `dc` columns and 10 rows per plane.
fn telescope(channel: u32, column: u16, dc: u16) -> Telescope {
    let planes = (0..3u16)
        .map(|i| Plane::from_clusters(vec![cluster(column + dc * i, 30 + 10 * i)]))
        .collect();
    Telescope::new(channel, planes)
}

fn crossing(channel: u32, column: u16, dc: u16) -> Event {
    Event::new(vec![telescope(channel, column, dc)])
}

fn analyzer(config: AnalyzerConfig) -> EventAnalyzer {
    EventAnalyzer::new(
        config,
        AlignmentTable::nominal(&[5], SPACING),
        CalibrationTable::parse(CALIBRATION).unwrap(),
        &[5],
    )
    .unwrap()
}

#[test]
fn test_clean_stream_is_fully_efficient() {
    let mut analyzer = analyzer(AnalyzerConfig::default().with_warmup_crossings(0));
    for _ in 0..100 {
        analyzer.analyze_event(&mut crossing(5, 20, 0)).unwrap();
    }

    assert_eq!(analyzer.bx_counter(), 100);
    assert_planes(analyzer.telescope_efficiency(5).unwrap(), [1.0, 1.0, 1.0]);
    assert_relative_eq!(analyzer.telescope_accidentals(5).unwrap(), 0.0);
    assert_relative_eq!(analyzer.zero_counting(5).unwrap(), 1.0);
}

#[test]
fn test_steep_tracks_are_accidental() {
    let mut analyzer = analyzer(AnalyzerConfig::default());
    for i in 0..1000 {
        let dc = if i % 100 == 0 { 3 } else { 0 };
        analyzer.analyze_event(&mut crossing(5, 10, dc)).unwrap();
    }

    let counters = analyzer.counters(5).unwrap();
    assert_eq!(counters.accidentals.accidental, 10);
    assert_eq!(counters.accidentals.classified, 990);
    assert_relative_eq!(analyzer.zero_counting(5).unwrap(), 0.99);
    assert_relative_eq!(analyzer.telescope_accidentals(5).unwrap(), 10.0 / 1980.0);
    // Everything so far is warm-up.
    assert_planes(analyzer.telescope_efficiency(5).unwrap(), [0.0; 3]);
}

#[test]
fn test_empty_crossings_dilute_zero_counting() {
    let mut analyzer = analyzer(AnalyzerConfig::default());
    for i in 0..40 {
        let mut event = if i % 4 == 0 {
            crossing(5, 20, 0)
        } else {
            Event::default()
        };
        analyzer.analyze_event(&mut event).unwrap();
    }
    assert_relative_eq!(analyzer.zero_counting(5).unwrap(), 0.25);
}

#[test]
fn test_masked_probe_pixel_is_not_measured() {
    let mask = PixelMask::parse("# channel plane column row\n5 1 20 40\n").unwrap();
    let mut analyzer = analyzer(AnalyzerConfig::default().with_warmup_crossings(0)).with_pixel_mask(mask);
    for _ in 0..10 {
        analyzer.analyze_event(&mut crossing(5, 20, 0)).unwrap();
    }
    let counters = analyzer.counters(5).unwrap();
    assert_eq!(counters.total.denominator, [10, 0, 10]);
    assert_planes(analyzer.telescope_efficiency(5).unwrap(), [1.0, 0.0, 1.0]);
}

#[test]
fn test_fiducial_window_limits_probes() {
    let window = FiducialRegion::Window {
        column_min: 15,
        column_max: 25,
        row_min: 0,
        row_max: 45,
    };
    let config = AnalyzerConfig::default()
        .with_warmup_crossings(0)
        .with_fiducial_region(window);
    let mut analyzer = analyzer(config);
    analyzer.analyze_event(&mut crossing(5, 20, 0)).unwrap();

    // Plane 2 is crossed at row 50, outside the window.
    assert_eq!(analyzer.counters(5).unwrap().total.denominator, [1, 1, 0]);
}

#[test]
fn test_reset_starts_a_new_interval() {
    let mut analyzer = analyzer(AnalyzerConfig::default().with_warmup_crossings(0));
    for _ in 0..5 {
        analyzer.analyze_event(&mut crossing(5, 20, 3)).unwrap();
    }
    assert_relative_eq!(analyzer.telescope_accidentals(5).unwrap(), 0.0);
    assert_eq!(analyzer.counters(5).unwrap().accidentals.accidental, 5);

    analyzer.reinitialize_counters();
    for _ in 0..4 {
        analyzer.analyze_event(&mut crossing(5, 20, 0)).unwrap();
    }
    assert_eq!(analyzer.bx_counter(), 4);
    assert_eq!(analyzer.counters(5).unwrap().accidentals.accidental, 0);
    assert_relative_eq!(analyzer.zero_counting(5).unwrap(), 1.0);
}

#[test]
fn test_telescope_order_within_event_is_irrelevant() {
    let build = || {
        EventAnalyzer::new(
            AnalyzerConfig::default().with_warmup_crossings(0),
            AlignmentTable::nominal(&[5, 8], SPACING),
            CalibrationTable::parse(CALIBRATION).unwrap(),
            &[5, 8],
        )
        .unwrap()
    };
    let mut forward = build();
    let mut reversed = build();
    forward
        .analyze_event(&mut Event::new(vec![telescope(5, 20, 0), telescope(8, 10, 3)]))
        .unwrap();
    reversed
        .analyze_event(&mut Event::new(vec![telescope(8, 10, 3), telescope(5, 20, 0)]))
        .unwrap();

    for analyzer in [&forward, &reversed] {
        // One crossing, however many telescopes it carries.
        assert_eq!(analyzer.bx_counter(), 1);

        let straight = analyzer.counters(5).unwrap();
        assert_eq!(straight.accidentals.accidental, 0);
        assert_eq!(straight.accidentals.classified, 1);
        assert_planes(analyzer.telescope_efficiency(5).unwrap(), [1.0; 3]);

        let steep = analyzer.counters(8).unwrap();
        assert_eq!(steep.accidentals.accidental, 1);
        assert_eq!(steep.accidentals.classified, 0);
        assert_eq!(steep.total.denominator, [0, 0, 0]);
    }
    assert_eq!(forward.snapshot(), reversed.snapshot());
}
