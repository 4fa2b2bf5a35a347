use configuration::PatternParams;
use core_types::{Direction, PatternKind};

use crate::detector::PatternDetector;
use crate::extrema::Extremum;
use crate::geometry::{clamp_unit, index_slope, mean};
use crate::pattern::{PatternPoint, PointRole, with_role};
use crate::window::PatternWindow;

const POLE_WEIGHT: f64 = 0.4;
const TIGHTNESS_WEIGHT: f64 = 0.4;
const VOLUME_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pole {
    Up,
    Down,
}

/// A sharp rally followed by a consolidation drifting sideways or down.
#[derive(Debug, Clone)]
pub struct BullFlag {
    params: PatternParams,
}

/// A sharp drop followed by a consolidation drifting sideways or up.
#[derive(Debug, Clone)]
pub struct BearFlag {
    params: PatternParams,
}

impl BullFlag {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl BearFlag {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

fn detect_flag(window: &PatternWindow<'_>, params: &PatternParams, pole: Pole) -> Vec<PatternPoint> {
    let (pole_ends, pole_starts) = match pole {
        Pole::Up => (window.peaks(), window.troughs()),
        Pole::Down => (window.troughs(), window.peaks()),
    };
    let extrema = window.extrema();

    for end in pole_ends.iter().rev() {
        let start = pole_starts
            .iter()
            .rev()
            .find(|s| s.index < end.index)
            .map(|s| (s.index, s.price))
            .unwrap_or((0, window.closes()[0]));
        if start.0 >= end.index || start.1 <= 0.0 {
            continue;
        }

        let mut pole_move = (end.price - start.1) / start.1;
        if pole == Pole::Down {
            pole_move = -pole_move;
        }
        if pole_move < params.min_pole_move {
            continue;
        }

        let flag: Vec<&Extremum> = extrema
            .iter()
            .filter(|e| e.index > end.index && e.index <= end.index + params.max_flag_bars)
            .collect();
        if flag.len() < 2 {
            continue;
        }
        let prices: Vec<f64> = flag.iter().map(|e| e.price).collect();
        let Some(drift) = relative_slope(&prices) else {
            continue;
        };
        let opposes = match pole {
            Pole::Up => drift <= 0.0,
            Pole::Down => drift >= 0.0,
        };
        if !opposes {
            continue;
        }

        let mut points = vec![
            window.point(start.0, PointRole::PoleStart),
            window.extremum_point(end, PointRole::PoleEnd),
        ];
        points.extend(flag.iter().map(|e| window.extremum_point(e, PointRole::Flag)));
        return points;
    }
    Vec::new()
}

fn score_flag(
    window: &PatternWindow<'_>,
    params: &PatternParams,
    points: &[PatternPoint],
    pole: Pole,
) -> f64 {
    let (Some(start), Some(end)) = (
        with_role(points, PointRole::PoleStart).first().copied(),
        with_role(points, PointRole::PoleEnd).first().copied(),
    ) else {
        return 0.0;
    };
    let flag = with_role(points, PointRole::Flag);
    if flag.len() < 2 || start.price <= 0.0 {
        return 0.0;
    }

    let height = match pole {
        Pole::Up => (end.price - start.price) / start.price,
        Pole::Down => (start.price - end.price) / start.price,
    };
    let pole_strength = clamp_unit(height / params.height_reference);

    let prices: Vec<f64> = flag.iter().map(|p| p.price).collect();
    let tightness = relative_slope(&prices)
        .map(|drift| clamp_unit(1.0 - drift.abs() / params.flag_slope_reference))
        .unwrap_or(0.0);

    let volume = match (
        window.local_index(&start),
        flag.last().and_then(|p| window.local_index(p)),
    ) {
        (Some(first), Some(last)) => window.volume_trend(first, last),
        _ => 0.0,
    };

    POLE_WEIGHT * pole_strength + TIGHTNESS_WEIGHT * tightness + VOLUME_WEIGHT * volume
}

/// Slope per point divided by the mean price.
fn relative_slope(prices: &[f64]) -> Option<f64> {
    let average = mean(prices)?;
    if average <= 0.0 {
        return None;
    }
    index_slope(prices).map(|slope| slope / average)
}

impl PatternDetector for BullFlag {
    fn kind(&self) -> PatternKind {
        PatternKind::BullFlag
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_flag(window, &self.params, Pole::Up)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_flag(window, &self.params, points, Pole::Up)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bullish
    }
}

impl PatternDetector for BearFlag {
    fn kind(&self) -> PatternKind {
        PatternKind::BearFlag
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        detect_flag(window, &self.params, Pole::Down)
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        score_flag(window, &self.params, points, Pole::Down)
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bearish
    }
}
