use configuration::PatternParams;
use core_types::{Direction, PatternKind};

use crate::detector::PatternDetector;
use crate::extrema::Extremum;
use crate::geometry::clamp_unit;
use crate::pattern::{PatternPoint, PointRole, with_role};
use crate::window::PatternWindow;

const SHAPE_WEIGHT: f64 = 0.35;
const HEIGHT_WEIGHT: f64 = 0.15;
const VOLUME_WEIGHT: f64 = 0.15;

const CLEAN_BONUS: f64 = 1.3;
const VOLUME_BONUS: f64 = 1.2;

/// Number of most recent peaks (and troughs) each trend line is fitted through.
const LINE_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Ascending,
    Descending,
    Symmetrical,
}

/// Flat resistance over rising support.
#[derive(Debug, Clone)]
pub struct AscendingTriangle {
    params: PatternParams,
}

/// Falling resistance over flat support.
#[derive(Debug, Clone)]
pub struct DescendingTriangle {
    params: PatternParams,
}

/// Falling resistance and rising support converging at similar rates.
#[derive(Debug, Clone)]
pub struct SymmetricalTriangle {
    params: PatternParams,
}

impl AscendingTriangle {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl DescendingTriangle {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl SymmetricalTriangle {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

/// Slopes of the resistance (peaks) and support (troughs) lines.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrendLines {
    pub upper: f64,
    pub lower: f64,
}

/// The last few peaks and troughs of `window`, as points.
pub(crate) fn boundary_points(window: &PatternWindow<'_>) -> Option<Vec<PatternPoint>> {
    let peaks = last(window.peaks(), LINE_POINTS);
    let troughs = last(window.troughs(), LINE_POINTS);
    if peaks.len() < 2 || troughs.len() < 2 {
        return None;
    }
    let mut points: Vec<PatternPoint> = peaks
        .iter()
        .map(|p| window.extremum_point(p, PointRole::Peak))
        .chain(troughs.iter().map(|t| window.extremum_point(t, PointRole::Trough)))
        .collect();
    points.sort_by_key(|p| p.index);
    Some(points)
}

/// Fits both trend lines through the `Peak` and `Trough` points.
pub(crate) fn trend_lines(window: &PatternWindow<'_>, points: &[PatternPoint]) -> Option<TrendLines> {
    let peaks = with_role(points, PointRole::Peak);
    let troughs = with_role(points, PointRole::Trough);
    if peaks.len() < 2 || troughs.len() < 2 {
        return None;
    }
    Some(TrendLines {
        upper: window.normalized_slope(&peaks)?,
        lower: window.normalized_slope(&troughs)?,
    })
}

fn last(extrema: &[Extremum], count: usize) -> &[Extremum] {
    &extrema[extrema.len().saturating_sub(count)..]
}

fn classify(lines: TrendLines, params: &PatternParams) -> Option<Shape> {
    let flat = params.flat_slope_threshold;
    let trend = params.trend_slope_threshold;

    if lines.upper.abs() < flat && lines.lower > trend {
        return Some(Shape::Ascending);
    }
    if lines.lower.abs() < flat && lines.upper < -trend {
        return Some(Shape::Descending);
    }
    if lines.upper < -trend && lines.lower > trend {
        let (small, large) = if lines.upper.abs() < lines.lower.abs() {
            (lines.upper.abs(), lines.lower.abs())
        } else {
            (lines.lower.abs(), lines.upper.abs())
        };
        if small / large > params.symmetry_ratio {
            return Some(Shape::Symmetrical);
        }
    }
    None
}

fn detect_shape(window: &PatternWindow<'_>, params: &PatternParams, shape: Shape) -> Vec<PatternPoint> {
    let Some(points) = boundary_points(window) else {
        return Vec::new();
    };
    match trend_lines(window, &points) {
        Some(lines) if classify(lines, params) == Some(shape) => points,
        _ => Vec::new(),
    }
}

fn score_shape(
    window: &PatternWindow<'_>,
    params: &PatternParams,
    points: &[PatternPoint],
    shape: Shape,
) -> f64 {
    let Some(lines) = trend_lines(window, points) else {
        return 0.0;
    };
    let peaks = with_role(points, PointRole::Peak);
    let troughs = with_role(points, PointRole::Trough);

    let (first_term, second_term) = match shape {
        Shape::Ascending => (
            flatness(lines.upper, params),
            clamp_unit(lines.lower / params.trend_reference),
        ),
        Shape::Descending => (
            flatness(lines.lower, params),
            clamp_unit(-lines.upper / params.trend_reference),
        ),
        Shape::Symmetrical => {
            let (upper, lower) = (lines.upper.abs(), lines.lower.abs());
            let symmetry = if upper.max(lower) > 0.0 {
                upper.min(lower) / upper.max(lower)
            } else {
                0.0
            };
            let convergence = clamp_unit((upper + lower) / (2.0 * params.trend_reference));
            (symmetry, convergence)
        }
    };

    let height = match (shape, peaks.last(), peaks.first(), troughs.first(), troughs.last()) {
        (Shape::Descending, _, Some(first_peak), _, Some(last_trough)) if first_peak.price > 0.0 => {
            (first_peak.price - last_trough.price) / first_peak.price
        }
        (_, Some(last_peak), _, Some(first_trough), _) if first_trough.price > 0.0 => {
            (last_peak.price - first_trough.price) / first_trough.price
        }
        _ => 0.0,
    };
    let height_score = clamp_unit(height / params.height_reference);

    let volume = match (
        points.first().and_then(|p| window.local_index(p)),
        points.last().and_then(|p| window.local_index(p)),
    ) {
        (Some(start), Some(end)) => window.volume_change(start, end),
        _ => 0.0,
    };

    let base = SHAPE_WEIGHT * first_term
        + SHAPE_WEIGHT * second_term
        + HEIGHT_WEIGHT * height_score
        + VOLUME_WEIGHT * volume;

    let bonus = if first_term > 0.8 && second_term > 0.6 {
        CLEAN_BONUS
    } else if volume > 0.7 {
        VOLUME_BONUS
    } else {
        1.0
    };
    clamp_unit(base * bonus)
}

fn flatness(slope: f64, params: &PatternParams) -> f64 {
    clamp_unit(1.0 - slope.abs() / params.flat_slope_threshold)
}

impl PatternDetector for AscendingTriangle {
    fn kind(&self) -> PatternKind {
        PatternKind::AscendingTriangle
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_shape(window, &self.params, Shape::Ascending)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_shape(window, &self.params, points, Shape::Ascending)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bullish
    }
}

impl PatternDetector for DescendingTriangle {
    fn kind(&self) -> PatternKind {
        PatternKind::DescendingTriangle
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_shape(window, &self.params, Shape::Descending)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_shape(window, &self.params, points, Shape::Descending)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bearish
    }
}

impl PatternDetector for SymmetricalTriangle {
    fn kind(&self) -> PatternKind {
        PatternKind::SymmetricalTriangle
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_shape(window, &self.params, Shape::Symmetrical)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_shape(window, &self.params, points, Shape::Symmetrical)
    }

    /// A continuation pattern; the breakout side is not implied by the shape.
    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Neutral
    }
}
