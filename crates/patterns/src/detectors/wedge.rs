use configuration::PatternParams;
use core_types::{Direction, PatternKind};

use crate::detector::PatternDetector;
use crate::detectors::triangle::{boundary_points, trend_lines};
use crate::geometry::clamp_unit;
use crate::pattern::{PatternPoint, PointRole, with_role};
use crate::window::PatternWindow;

const CONVERGENCE_WEIGHT: f64 = 0.4;
const HEIGHT_WEIGHT: f64 = 0.4;
const VOLUME_WEIGHT: f64 = 0.2;

/// Both lines rising, support steeper than resistance. Bearish.
#[derive(Debug, Clone)]
pub struct RisingWedge {
    params: PatternParams,
}

/// Both lines falling, resistance steeper than support. Bullish.
#[derive(Debug, Clone)]
pub struct FallingWedge {
    params: PatternParams,
}

impl RisingWedge {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl FallingWedge {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

fn detect_wedge(window: &PatternWindow<'_>, rising: bool) -> Vec<PatternPoint> {
    let Some(points) = boundary_points(window) else {
        return Vec::new();
    };
    let Some(lines) = trend_lines(window, &points) else {
        return Vec::new();
    };

    let same_direction = if rising {
        lines.upper > 0.0 && lines.lower > 0.0
    } else {
        lines.upper < 0.0 && lines.lower < 0.0
    };
    // Converging: resistance rises slower (or falls faster) than support.
    if same_direction && lines.upper < lines.lower {
        points
    } else {
        Vec::new()
    }
}

fn score_wedge(
    window: &PatternWindow<'_>,
    params: &PatternParams,
    points: &[PatternPoint],
    rising: bool,
) -> f64 {
    let Some(lines) = trend_lines(window, points) else {
        return 0.0;
    };
    let peaks = with_role(points, PointRole::Peak);
    let troughs = with_role(points, PointRole::Trough);

    let convergence =
        clamp_unit((lines.upper - lines.lower).abs() / params.wedge_convergence_reference);

    let height = match (peaks.first(), peaks.last(), troughs.first(), troughs.last()) {
        (_, Some(last_peak), Some(first_trough), _) if rising && first_trough.price > 0.0 => {
            (last_peak.price - first_trough.price) / first_trough.price
        }
        (Some(first_peak), _, _, Some(last_trough)) if !rising && first_peak.price > 0.0 => {
            (first_peak.price - last_trough.price) / first_peak.price
        }
        _ => 0.0,
    };
    let height_score = clamp_unit(height / params.wedge_height_reference);

    let volume = match (
        points.first().and_then(|p| window.local_index(p)),
        points.last().and_then(|p| window.local_index(p)),
    ) {
        (Some(start), Some(end)) => window.volume_trend(start, end),
        _ => 0.0,
    };

    CONVERGENCE_WEIGHT * convergence + HEIGHT_WEIGHT * height_score + VOLUME_WEIGHT * volume
}

impl PatternDetector for RisingWedge {
    fn kind(&self) -> PatternKind {
        PatternKind::RisingWedge
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_wedge(window, true)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_wedge(window, &self.params, points, true)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bearish
    }
}

impl PatternDetector for FallingWedge {
    fn kind(&self) -> PatternKind {
        PatternKind::FallingWedge
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_wedge(window, false)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_wedge(window, &self.params, points, false)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bullish
    }
}
