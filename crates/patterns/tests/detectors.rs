//! Detector behaviour on hand-built price paths.
//!
//! Each path is a piecewise-linear interpolation between anchor points, so the
//! extrema land exactly on the anchors.

use chrono::{Duration, TimeZone, Utc};
use configuration::PatternParams;
use core_types::{Candle, Direction, PatternKind};
use patterns::detectors::{
    AscendingTriangle, BearFlag, BullFlag, DescendingTriangle, DoubleBottom, DoubleTop,
    FallingWedge, HeadAndShoulders, RisingWedge, SymmetricalTriangle,
};
use patterns::{
    PatternDetector, PatternOrchestrator, PatternWindow, PointRole, create_detector, scan_windows,
};
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
    let mut closes = Vec::new();
    for pair in anchors.windows(2) {
        let ((i0, p0), (i1, p1)) = (pair[0], pair[1]);
        for i in i0..i1 {
            let t = (i - i0) as f64 / (i1 - i0) as f64;
            closes.push(p0 + (p1 - p0) * t);
        }
    }
    if let Some(&(_, last)) = anchors.last() {
        closes.push(last);
    }
    closes
}

/// Reflects a path about the 110 level, turning peaks into troughs.
fn mirror(closes: &[f64]) -> Vec<f64> {
    closes.iter().map(|c| 220.0 - c).collect()
}

fn candles(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle::new(start + Duration::hours(i as i64), c, c * 1.002, c * 0.998, c, 1_000.0))
        .collect()
}

fn params(order: usize, min_relative_change: f64) -> PatternParams {
    PatternParams {
        extremum_order: order,
        min_relative_change,
        ..PatternParams::default()
    }
}

// ============================================================================
// Double bottom
// ============================================================================

#[test]
fn double_bottom_within_tolerance_is_bullish() {
    let closes = path(&[(0, 112.0), (10, 100.0), (20, 110.0), (30, 101.5), (40, 109.0)]);
    let data = candles(&closes);
    let params = PatternParams {
        level_tolerance: 0.08,
        min_separation: 3,
        ..params(3, 0.015)
    };
    let window = PatternWindow::from_params(&data, 0, &params);

    let detector = DoubleBottom::new(params.clone());
    let instance = detector.find(&window).expect("double bottom");

    assert_eq!(instance.kind, PatternKind::DoubleBottom);
    assert_eq!(instance.direction, Direction::Bullish);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);
    assert_eq!(instance.start_index, 10);
    assert_eq!(instance.end_index, 30);
    assert_eq!(instance.points[1].role, PointRole::Peak);
    assert_eq!(instance.points[1].price, 110.0);

    assert!(DoubleTop::new(params).find(&window).is_none());
}

#[test]
fn double_bottom_respects_min_separation() {
    let closes = path(&[(0, 112.0), (10, 100.0), (20, 110.0), (30, 101.5), (40, 109.0)]);
    let data = candles(&closes);
    let params = PatternParams {
        level_tolerance: 0.08,
        min_separation: 25,
        ..params(3, 0.015)
    };
    let window = PatternWindow::from_params(&data, 0, &params);
    assert!(DoubleBottom::new(params).find(&window).is_none());
}

#[test]
fn double_bottom_outside_tolerance_is_rejected() {
    let closes = path(&[(0, 112.0), (10, 100.0), (20, 110.0), (30, 101.5), (40, 109.0)]);
    let data = candles(&closes);
    let params = PatternParams {
        level_tolerance: 0.005,
        ..params(3, 0.015)
    };
    let window = PatternWindow::from_params(&data, 0, &params);
    assert!(DoubleBottom::new(params).find(&window).is_none());
}

#[test]
fn double_top_mirrors_double_bottom() {
    let closes = mirror(&path(&[(0, 112.0), (10, 100.0), (20, 110.0), (30, 101.5), (40, 109.0)]));
    let data = candles(&closes);
    let params = PatternParams {
        level_tolerance: 0.08,
        min_separation: 3,
        ..params(3, 0.015)
    };
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = DoubleTop::new(params.clone()).find(&window).expect("double top");

    assert_eq!(instance.kind, PatternKind::DoubleTop);
    assert_eq!(instance.direction, Direction::Bearish);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);
    assert_eq!(instance.start_index, 10);
    assert_eq!(instance.end_index, 30);
    assert_eq!(instance.points[1].role, PointRole::Trough);
    assert_eq!(instance.points[1].price, 110.0);

    assert!(DoubleBottom::new(params).find(&window).is_none());
}

// ============================================================================
// Head and shoulders
// ============================================================================

#[test]
fn head_and_shoulders_is_bearish_with_neckline() {
    let closes = path(&[
        (0, 100.0),
        (8, 110.0),
        (14, 104.0),
        (22, 118.0),
        (30, 104.5),
        (38, 110.5),
        (46, 100.0),
    ]);
    let data = candles(&closes);
    let params = params(3, 0.015);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = HeadAndShoulders::new(params).find(&window).expect("head and shoulders");

    assert_eq!(instance.direction, Direction::Bearish);
    let roles: Vec<PointRole> = instance.points.iter().map(|p| p.role).collect();
    assert_eq!(
        roles,
        vec![
            PointRole::LeftShoulder,
            PointRole::Neckline,
            PointRole::Head,
            PointRole::Neckline,
            PointRole::RightShoulder,
        ]
    );
    assert_eq!(instance.points[2].price, 118.0);
    assert!(instance.confidence > 0.8, "confidence {}", instance.confidence);
}

#[test]
fn head_below_shoulder_is_not_a_pattern() {
    let closes = path(&[
        (0, 100.0),
        (8, 110.0),
        (14, 104.0),
        (22, 108.0),
        (30, 104.5),
        (38, 110.5),
        (46, 100.0),
    ]);
    let data = candles(&closes);
    let params = params(3, 0.015);
    let window = PatternWindow::from_params(&data, 0, &params);
    assert!(HeadAndShoulders::new(params).find(&window).is_none());
}

// ============================================================================
// Triangles
// ============================================================================

#[test]
fn ascending_triangle_flat_resistance_rising_support() {
    let closes = path(&[
        (0, 100.0),
        (6, 110.0),
        (12, 102.0),
        (18, 110.0),
        (24, 104.0),
        (30, 110.0),
        (36, 106.0),
        (42, 110.0),
        (48, 106.0),
    ]);
    let data = candles(&closes);
    let params = params(3, 0.015);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = AscendingTriangle::new(params.clone())
        .find(&window)
        .expect("ascending triangle");

    assert_eq!(instance.direction, Direction::Bullish);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);
    assert_eq!(instance.points_with(PointRole::Peak).count(), 3);
    assert_eq!(instance.points_with(PointRole::Trough).count(), 3);

    // Flat resistance never classifies as a rising wedge.
    assert!(RisingWedge::new(params).find(&window).is_none());
}

#[test]
fn descending_triangle_flat_support_falling_resistance() {
    let closes = mirror(&path(&[
        (0, 100.0),
        (6, 110.0),
        (12, 102.0),
        (18, 110.0),
        (24, 104.0),
        (30, 110.0),
        (36, 106.0),
        (42, 110.0),
        (48, 106.0),
    ]));
    let data = candles(&closes);
    let params = params(3, 0.015);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = DescendingTriangle::new(params.clone())
        .find(&window)
        .expect("descending triangle");

    assert_eq!(instance.kind, PatternKind::DescendingTriangle);
    assert_eq!(instance.direction, Direction::Bearish);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);

    assert!(AscendingTriangle::new(params.clone()).find(&window).is_none());
    assert!(SymmetricalTriangle::new(params).find(&window).is_none());
}

#[test]
fn symmetrical_triangle_converges_from_both_sides() {
    let closes = path(&[
        (0, 110.0),
        (6, 120.0),
        (12, 100.0),
        (18, 116.0),
        (24, 104.0),
        (30, 112.0),
        (36, 108.0),
        (42, 114.0),
    ]);
    let data = candles(&closes);
    let params = params(3, 0.015);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = SymmetricalTriangle::new(params.clone())
        .find(&window)
        .expect("symmetrical triangle");

    assert_eq!(instance.kind, PatternKind::SymmetricalTriangle);
    assert_eq!(instance.direction, Direction::Neutral);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);
    assert_eq!(instance.points_with(PointRole::Peak).count(), 3);
    assert_eq!(instance.points_with(PointRole::Trough).count(), 3);

    assert!(AscendingTriangle::new(params.clone()).find(&window).is_none());
    assert!(DescendingTriangle::new(params).find(&window).is_none());
}

// ============================================================================
// Flags
// ============================================================================

#[test]
fn bull_flag_after_strong_pole() {
    let closes = path(&[
        (0, 104.0),
        (5, 100.0),
        (15, 112.0),
        (19, 109.0),
        (23, 110.8),
        (27, 108.0),
        (31, 109.8),
        (35, 108.5),
        (39, 109.0),
    ]);
    let data = candles(&closes);
    let params = params(2, 0.005);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = BullFlag::new(params).find(&window).expect("bull flag");

    assert_eq!(instance.direction, Direction::Bullish);
    let pole: Vec<usize> = instance
        .points
        .iter()
        .filter(|p| matches!(p.role, PointRole::PoleStart | PointRole::PoleEnd))
        .map(|p| p.index)
        .collect();
    assert_eq!(pole, vec![5, 15]);
    assert_eq!(instance.points_with(PointRole::Flag).count(), 4);
    assert!(instance.confidence > 0.7);
}

#[test]
fn bear_flag_after_strong_drop() {
    let closes = mirror(&path(&[
        (0, 104.0),
        (5, 100.0),
        (15, 112.0),
        (19, 109.0),
        (23, 110.8),
        (27, 108.0),
        (31, 109.8),
        (35, 108.5),
        (39, 109.0),
    ]));
    let data = candles(&closes);
    let params = params(2, 0.005);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = BearFlag::new(params.clone()).find(&window).expect("bear flag");

    assert_eq!(instance.kind, PatternKind::BearFlag);
    assert_eq!(instance.direction, Direction::Bearish);
    let pole: Vec<usize> = instance
        .points
        .iter()
        .filter(|p| matches!(p.role, PointRole::PoleStart | PointRole::PoleEnd))
        .map(|p| p.index)
        .collect();
    assert_eq!(pole, vec![5, 15]);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);

    assert!(BullFlag::new(params).find(&window).is_none());
}

// ============================================================================
// Wedges
// ============================================================================

#[test]
fn falling_wedge_is_bullish() {
    let closes = path(&[
        (0, 112.0),
        (4, 120.0),
        (8, 110.0),
        (12, 116.0),
        (16, 108.0),
        (20, 112.0),
        (24, 106.0),
        (28, 108.5),
        (32, 104.5),
    ]);
    let data = candles(&closes);
    let params = params(2, 0.005);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = FallingWedge::new(params.clone())
        .find(&window)
        .expect("falling wedge");
    assert_eq!(instance.direction, Direction::Bullish);
    assert!(instance.confidence > 0.5);

    assert!(RisingWedge::new(params).find(&window).is_none());
}

#[test]
fn rising_wedge_is_bearish() {
    let closes = mirror(&path(&[
        (0, 112.0),
        (4, 120.0),
        (8, 110.0),
        (12, 116.0),
        (16, 108.0),
        (20, 112.0),
        (24, 106.0),
        (28, 108.5),
        (32, 104.5),
    ]));
    let data = candles(&closes);
    let params = params(2, 0.005);
    let window = PatternWindow::from_params(&data, 0, &params);

    let instance = RisingWedge::new(params.clone())
        .find(&window)
        .expect("rising wedge");
    assert_eq!(instance.kind, PatternKind::RisingWedge);
    assert_eq!(instance.direction, Direction::Bearish);
    assert!(instance.confidence > 0.0 && instance.confidence <= 1.0);

    assert!(FallingWedge::new(params).find(&window).is_none());
}

// ============================================================================
// Orchestrator and scanning
// ============================================================================

#[test]
fn orchestrator_output_is_ordered_and_above_threshold() {
    let closes = path(&[
        (0, 100.0),
        (6, 110.0),
        (12, 102.0),
        (18, 110.0),
        (24, 104.0),
        (30, 110.0),
        (36, 106.0),
        (42, 110.0),
        (48, 106.0),
    ]);
    let data = candles(&closes);
    let orchestrator = PatternOrchestrator::new(params(3, 0.015)).unwrap();
    let window = orchestrator.window(&data, 0);

    let patterns = orchestrator.analyze(&window, 0.3);
    assert!(patterns.iter().any(|p| p.kind == PatternKind::AscendingTriangle));
    assert!(patterns.iter().all(|p| p.confidence >= 0.3));
    assert!(patterns.windows(2).all(|w| w[0].end_index <= w[1].end_index));
}

#[test]
fn parallel_scan_matches_single_window() {
    let closes = path(&[(0, 112.0), (10, 100.0), (20, 110.0), (30, 101.5), (40, 109.0), (50, 104.0)]);
    let data = candles(&closes);
    let orchestrator = PatternOrchestrator::new(PatternParams {
        level_tolerance: 0.08,
        ..params(3, 0.015)
    })
    .unwrap();

    let scans = scan_windows(&orchestrator, &data, 41, 1, 0.0).unwrap();
    let first = scans.iter().find(|s| s.end_index == 40).expect("window ending at 40");

    let window = orchestrator.window(&data[..=40], 0);
    assert_eq!(first.patterns, orchestrator.analyze(&window, 0.0));
    assert!(scans.windows(2).all(|w| w[0].end_index < w[1].end_index));

    assert!(scan_windows(&orchestrator, &data, 0, 1, 0.5).is_err());
    assert!(scan_windows(&orchestrator, &data, 500, 1, 0.5).unwrap().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(50.0..150.0_f64, 0..120)
}

proptest! {
    #[test]
    fn confidence_is_bounded_for_any_series(closes in arb_closes(), order in 1usize..6) {
        let data = candles(&closes);
        let params = params(order, 0.005);
        let window = PatternWindow::from_params(&data, 0, &params);

        for kind in PatternKind::ALL {
            let detector = create_detector(kind, &params);
            let points = detector.detect(&window);
            let confidence = detector.confidence(&window, &points);
            prop_assert!((0.0..=1.0).contains(&confidence), "{kind}: {confidence}");
            prop_assert_eq!(detector.confidence(&window, &[]), 0.0);

            if let Some(instance) = detector.find(&window) {
                prop_assert!((0.0..=1.0).contains(&instance.confidence));
                prop_assert!(instance.start_index <= instance.end_index);
                prop_assert!(instance.end_index < data.len());
            }
        }
    }

    #[test]
    fn short_windows_never_match(closes in prop::collection::vec(50.0..150.0_f64, 0..5)) {
        let data = candles(&closes);
        let params = PatternParams::default();
        let window = PatternWindow::from_params(&data, 0, &params);

        for kind in PatternKind::ALL {
            prop_assert!(create_detector(kind, &params).find(&window).is_none());
        }
    }
}
