use configuration::PatternParams;
use core_types::{Direction, PatternKind};

use crate::detector::PatternDetector;
use crate::geometry::{clamp_unit, time_symmetry};
use crate::pattern::{PatternPoint, PointRole, with_role};
use crate::window::PatternWindow;

const SHOULDER_WEIGHT: f64 = 0.3;
const TIME_WEIGHT: f64 = 0.2;
const HEAD_WEIGHT: f64 = 0.2;
const NECKLINE_WEIGHT: f64 = 0.2;
const VOLUME_WEIGHT: f64 = 0.1;

/// A neckline drifting by 1% of its price per bar scores zero flatness.
const NECKLINE_DRIFT_SCALE: f64 = 100.0;

/// Left shoulder, higher head, right shoulder, with a trough on either side of the head.
#[derive(Debug, Clone)]
pub struct HeadAndShoulders {
    params: PatternParams,
}

impl HeadAndShoulders {
    pub fn new(params: PatternParams) -> Self {
        Self { params }
    }
}

impl PatternDetector for HeadAndShoulders {
    fn kind(&self) -> PatternKind {
        PatternKind::HeadAndShoulders
    }

    fn min_points(&self) -> usize {
        self.params.min_points
    }

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint> {
        let peaks = window.peaks();
        let troughs = window.troughs();
        if peaks.len() < 3 || troughs.len() < 2 {
            return Vec::new();
        }

        for triple in peaks.windows(3).rev() {
            let (left, head, right) = (&triple[0], &triple[1], &triple[2]);
            if head.price <= left.price || head.price <= right.price {
                continue;
            }
            let shoulder_avg = (left.price + right.price) / 2.0;
            if (left.price - right.price).abs() / shoulder_avg > self.params.shoulder_tolerance {
                continue;
            }

            let left_neck = troughs
                .iter()
                .find(|t| t.index > left.index && t.index < head.index);
            let right_neck = troughs
                .iter()
                .find(|t| t.index > head.index && t.index < right.index);

            if let (Some(left_neck), Some(right_neck)) = (left_neck, right_neck) {
                return vec![
                    window.extremum_point(left, PointRole::LeftShoulder),
                    window.extremum_point(left_neck, PointRole::Neckline),
                    window.extremum_point(head, PointRole::Head),
                    window.extremum_point(right_neck, PointRole::Neckline),
                    window.extremum_point(right, PointRole::RightShoulder),
                ];
            }
        }
        Vec::new()
    }

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64 {
        let (Some(left), Some(head), Some(right)) = (
            with_role(points, PointRole::LeftShoulder).first().copied(),
            with_role(points, PointRole::Head).first().copied(),
            with_role(points, PointRole::RightShoulder).first().copied(),
        ) else {
            return 0.0;
        };
        let neckline = with_role(points, PointRole::Neckline);
        if neckline.len() < 2 || !(left.index < head.index && head.index < right.index) {
            return 0.0;
        }

        let shoulder_avg = (left.price + right.price) / 2.0;
        if shoulder_avg <= 0.0 {
            return 0.0;
        }
        let shoulder_symmetry = clamp_unit(1.0 - (left.price - right.price).abs() / shoulder_avg);
        let timing = time_symmetry(left.index, head.index, right.index);
        let prominence = clamp_unit(
            (head.price - left.price.max(right.price)) / shoulder_avg / self.params.depth_reference,
        );
        let flatness = neckline_flatness(&neckline[0], &neckline[1]);
        let volume = match (window.local_index(&left), window.local_index(&right)) {
            (Some(start), Some(end)) => window.volume_trend(start, end),
            _ => 0.0,
        };

        SHOULDER_WEIGHT * shoulder_symmetry
            + TIME_WEIGHT * timing
            + HEAD_WEIGHT * prominence
            + NECKLINE_WEIGHT * flatness
            + VOLUME_WEIGHT * volume
    }

    fn direction(&self, _points: &[PatternPoint]) -> Direction {
        Direction::Bearish
    }
}

fn neckline_flatness(first: &PatternPoint, second: &PatternPoint) -> f64 {
    let bars = second.index.abs_diff(first.index);
    let level = (first.price + second.price) / 2.0;
    if bars == 0 || level <= 0.0 {
        return 0.0;
    }
    let drift_per_bar = (second.price - first.price).abs() / level / bars as f64;
    clamp_unit(1.0 - drift_per_bar * NECKLINE_DRIFT_SCALE)
}
