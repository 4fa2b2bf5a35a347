use core_types::{Direction, PatternKind};

use crate::geometry::clamp_unit;
use crate::pattern::{PatternInstance, PatternPoint};
use crate::window::PatternWindow;

/// One geometric pattern family.
///
/// `detect` returns the raw points of the most recent valid formation, or an
/// empty list. `confidence` must stay within `[0, 1]` for any input and return
/// 0.0 when the points do not describe the shape.
pub trait PatternDetector: Send + Sync {
    fn kind(&self) -> PatternKind;

    /// Windows shorter than this never produce a pattern.
    fn min_points(&self) -> usize;

    fn detect(&self, window: &PatternWindow<'_>) -> Vec<PatternPoint>;

    fn confidence(&self, window: &PatternWindow<'_>, points: &[PatternPoint]) -> f64;

    fn direction(&self, points: &[PatternPoint]) -> Direction;

    /// Runs the full detection and scores the result.
    fn find(&self, window: &PatternWindow<'_>) -> Option<PatternInstance> {
        if window.len() < self.min_points() {
            return None;
        }
        let points = self.detect(window);
        if points.is_empty() {
            return None;
        }
        let confidence = clamp_unit(self.confidence(window, &points));
        let direction = self.direction(&points);
        PatternInstance::new(self.kind(), points, confidence, direction)
    }
}
