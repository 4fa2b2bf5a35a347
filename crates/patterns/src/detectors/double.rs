use configuration::PatternParams;
use core_types::{Direction, PatternKind};

use crate::detector::PatternDetector;
use crate::extrema::Extremum;
use crate::geometry::{clamp_unit, time_symmetry};
use crate::pattern::{PatternPoint, PointRole, with_role};
use crate::window::PatternWindow;

const LEVEL_WEIGHT: f64 = 0.3;
const DEPTH_WEIGHT: f64 = 0.3;
const TIME_WEIGHT: f64 = 0.2;
const VOLUME_WEIGHT: f64 = 0.2;

/// Which side of the market the repeated level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Top,
    Bottom,
}

/// Two peaks at the same level with a trough between them.
#[derive(Debug, Clone)]
pub struct DoubleTop {
    params: PatternParams,
}

impl DoubleTop {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

/// Two troughs at the same level with a peak between them.
#[derive(Debug, Clone)]
pub struct DoubleBottom {
    params: PatternParams,
}

impl DoubleBottom {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl PatternDetector for DoubleTop {
    fn kind(&self) -> PatternKind {
        PatternKind::DoubleTop
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_level(window, &self.params, Level::Top)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_level(window, &self.params, points, Level::Top)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bearish
    }
}

impl PatternDetector for DoubleBottom {
    fn kind(&self) -> PatternKind {
        PatternKind::DoubleBottom
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_level(window, &self.params, Level::Bottom)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_level(window, &self.params, points, Level::Bottom)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bullish
    }
}

fn roles(level: Level) -> (PointRole, PointRole) {
    match level {
        Level::Top => (PointRole::Peak, PointRole::Trough),
        Level::Bottom => (PointRole::Trough, PointRole::Peak),
    }
}

/// Every price lies within `tolerance` (relative) of the pair's mean.
fn is_valid_level(first: f64, second: f64, tolerance: f64) -> bool {
    let average = (first + second) / 2.0;
    average > 0.0
        && [first, second]
            .iter()
            .all(|p| (p - average).abs() / average <= tolerance)
}

fn detect_level(
    window: &PatternWindow<'_>,
    params: &PatternParams,
    level: Level,
) -> Vec<PatternPoint> {
    let (anchors, opposite): (&[Extremum], &[Extremum]) = match level {
        Level::Top => (window.peaks(), window.troughs()),
        Level::Bottom => (window.troughs(), window.peaks()),
    };
    let (anchor_role, middle_role) = roles(level);

    for pair in anchors.windows(2).rev() {
        let (first, second) = (&pair[0], &pair[1]);
        if second.index - first.index < params.min_separation {
            continue;
        }
        if !is_valid_level(first.price, second.price, params.level_tolerance) {
            continue;
        }

        let between = opposite
            .iter()
            .filter(|e| e.index > first.index && e.index < second.index);
        let middle = match level {
            Level::Top => between.min_by(|a, b| a.price.total_cmp(&b.price)),
            Level::Bottom => between.max_by(|a, b| a.price.total_cmp(&b.price)),
        };

        if let Some(middle) = middle {
            return vec![
                window.extremum_point(first, anchor_role),
                window.extremum_point(middle, middle_role),
                window.extremum_point(second, anchor_role),
            ];
        }
    }
    Vec::new()
}

fn score_level(
    window: &PatternWindow<'_>,
    params: &PatternParams,
    points: &[PatternPoint],
    level: Level,
) -> f64 {
    let (anchor_role, middle_role) = roles(level);
    let anchors = with_role(points, anchor_role);
    let (Some(middle), [first, second, ..]) =
        (with_role(points, middle_role).first().copied(), anchors.as_slice())
    else {
        return 0.0;
    };

    let average = (first.price + second.price) / 2.0;
    if average <= 0.0 {
        return 0.0;
    }
    let accuracy = clamp_unit(1.0 - (first.price - second.price).abs() / average);

    let depth = match level {
        Level::Top => (first.price - middle.price) / first.price,
        Level::Bottom => (middle.price - first.price) / first.price,
    };
    let depth_score = clamp_unit(depth / params.depth_reference);
    let timing = time_symmetry(first.index, middle.index, second.index);
    let volume = match (window.local_index(first), window.local_index(second)) {
        (Some(start), Some(end)) => window.volume_trend(start, end),
        _ => 0.0,
    };

    LEVEL_WEIGHT * accuracy + DEPTH_WEIGHT * depth_score + TIME_WEIGHT * timing + VOLUME_WEIGHT * volume
}
