use chrono::{DateTime, Utc};
use core_types::{Direction, PatternKind};
use serde::{Deserialize, Serialize};

/// The part a point plays in a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointRole {
    LeftShoulder,
    Head,
    RightShoulder,
    Neckline,
    Peak,
    Trough,
    PoleStart,
    PoleEnd,
    Flag,
}

/// One constituent point of a pattern. `index` is absolute within the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub role: PointRole,
}

/// A detected formation. Built from a single window and never carried across bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInstance {
    pub kind: PatternKind,
    /// Points in chronological order.
    pub points: Vec<PatternPoint>,
    pub confidence: f64,
    pub direction: Direction,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl PatternInstance {
    /// Sorts the points and derives the time span. `None` for an empty point list.
    pub fn new(
        kind: PatternKind,
        mut points: Vec<PatternPoint>,
        confidence: f64,
        direction: Direction,
    ) -> Option<Self> {
        points.sort_by_key(|p| p.index);
        let first = *points.first()?;
        let last = *points.last()?;

        Some(Self {
            kind,
            points,
            confidence,
            direction,
            start_index: first.index,
            end_index: last.index,
            start_time: first.timestamp,
            end_time: last.timestamp,
        })
    }

    /// True when the two index spans intersect.
    pub fn overlaps(&self, other: &PatternInstance) -> bool {
        self.start_index <= other.end_index && other.start_index <= self.end_index
    }

    pub fn high(&self) -> f64 {
        self.points.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn low(&self) -> f64 {
        self.points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min)
    }

    /// Price distance between the highest and lowest point.
    pub fn height(&self) -> f64 {
        self.high() - self.low()
    }

    pub fn points_with(&self, role: PointRole) -> impl Iterator<Item = &PatternPoint> {
        self.points.iter().filter(move |p| p.role == role)
    }
}

/// Points of `points` that play `role`, in the order given.
pub(crate) fn with_role(points: &[PatternPoint], role: PointRole) -> Vec<PatternPoint> {
    points.iter().copied().filter(|p| p.role == role).collect()
}
