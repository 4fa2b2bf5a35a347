use configuration::PatternParams;
use core_types::{Candle, PatternKind};

use crate::detector::PatternDetector;
use crate::detectors::create_detector;
use crate::error::PatternError;
use crate::pattern::PatternInstance;
use crate::window::PatternWindow;

/// Runs a set of detectors over one window and reconciles their output.
pub struct PatternOrchestrator {
    params: PatternParams,
    detectors: Vec<Box<dyn PatternDetector>>,
}

impl PatternOrchestrator {
    /// Builds one detector per enabled pattern kind.
    pub fn new(params: PatternParams) -> Result<Self, PatternError> {
        params
            .validate()
            .map_err(|e| PatternError::InvalidParameters(e.to_string()))?;

        let mut kinds: Vec<PatternKind> = params.enabled.clone();
        kinds.sort();
        kinds.dedup();
        if kinds.is_empty() {
            return Err(PatternError::InvalidParameters(
                "at least one pattern kind must be enabled".to_string(),
            ));
        }

        let detectors = kinds
            .into_iter()
            .map(|kind| create_detector(kind, &params))
            .collect();
        Ok(Self { params, detectors })
    }

    /// Uses a caller-supplied detector set.
    pub fn with_detectors(params: PatternParams, detectors: Vec<Box<dyn PatternDetector>>) -> Self {
        Self { params, detectors }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    pub fn kinds(&self) -> Vec<PatternKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Wraps `candles` (starting at absolute index `offset`) in a window using these params.
    pub fn window<'a>(&self, candles: &'a [Candle], offset: usize) -> PatternWindow<'a> {
        PatternWindow::from_params(candles, offset, &self.params)
    }

    /// Every detector's pattern at or above `min_confidence`, ordered by end index.
    pub fn detect_patterns(
        &self,
        window: &PatternWindow<'_>,
        min_confidence: f64,
    ) -> Vec<PatternInstance> {
        let found: Vec<PatternInstance> = self
            .detectors
            .iter()
            .filter_map(|detector| detector.find(window))
            .collect();

        tracing::trace!(
            offset = window.offset(),
            len = window.len(),
            found = found.len(),
            "Pattern detectors ran"
        );

        let mut patterns = Self::filter_patterns(found, min_confidence);
        sort_by_end(&mut patterns);
        patterns
    }

    /// Keeps patterns whose confidence is at least `min_confidence`.
    pub fn filter_patterns(
        patterns: Vec<PatternInstance>,
        min_confidence: f64,
    ) -> Vec<PatternInstance> {
        patterns
            .into_iter()
            .filter(|p| p.confidence >= min_confidence)
            .collect()
    }

    /// Drops every pattern that overlaps a higher-ranked pattern of another
    /// direction. Rank is confidence, then the most recent end. Conflicts are
    /// pairwise: a pattern is only ever judged against the patterns it overlaps.
    pub fn resolve_conflicts(patterns: Vec<PatternInstance>) -> Vec<PatternInstance> {
        if patterns.len() < 2 {
            return patterns;
        }
        let beaten: Vec<bool> = patterns
            .iter()
            .map(|pattern| {
                patterns.iter().any(|other| {
                    other.direction != pattern.direction
                        && overlaps(pattern, other)
                        && rank(other, pattern) == std::cmp::Ordering::Greater
                })
            })
            .collect();

        let mut resolved: Vec<PatternInstance> = patterns
            .into_iter()
            .zip(beaten)
            .filter_map(|(pattern, beaten)| (!beaten).then_some(pattern))
            .collect();
        sort_by_end(&mut resolved);
        resolved
    }

    /// Detection, filtering and conflict resolution in one call.
    pub fn analyze(&self, window: &PatternWindow<'_>, min_confidence: f64) -> Vec<PatternInstance> {
        Self::resolve_conflicts(self.detect_patterns(window, min_confidence))
    }

    /// The single highest-ranked pattern: highest confidence, then most recent.
    pub fn strongest(patterns: &[PatternInstance]) -> Option<&PatternInstance> {
        patterns.iter().max_by(|a, b| rank(a, b))
    }
}

fn rank(a: &PatternInstance, b: &PatternInstance) -> std::cmp::Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then(a.end_index.cmp(&b.end_index))
        .then(a.start_index.cmp(&b.start_index))
        .then(b.kind.cmp(&a.kind))
}

fn overlaps(a: &PatternInstance, b: &PatternInstance) -> bool {
    a.start_index <= b.end_index && b.start_index <= a.end_index
}

fn sort_by_end(patterns: &mut [PatternInstance]) {
    patterns.sort_by(|a, b| {
        a.end_index
            .cmp(&b.end_index)
            .then(a.start_index.cmp(&b.start_index))
            .then(a.kind.cmp(&b.kind))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternPoint, PointRole};
    use chrono::{Duration, TimeZone, Utc};
    use core_types::Direction;

    fn instance(
        kind: PatternKind,
        start: usize,
        end: usize,
        confidence: f64,
        direction: Direction,
    ) -> PatternInstance {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let point = |index: usize| PatternPoint {
            index,
            timestamp: origin + Duration::hours(index as i64),
            price: 100.0,
            role: PointRole::Peak,
        };
        PatternInstance::new(kind, vec![point(start), point(end)], confidence, direction).unwrap()
    }

    #[test]
    fn filter_is_a_threshold() {
        let patterns = vec![
            instance(PatternKind::DoubleTop, 0, 10, 0.69, Direction::Bearish),
            instance(PatternKind::DoubleBottom, 0, 10, 0.7, Direction::Bullish),
        ];
        let kept = PatternOrchestrator::filter_patterns(patterns, 0.7);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind, PatternKind::DoubleBottom);
    }

    #[test]
    fn conflicting_overlap_keeps_most_confident() {
        let patterns = vec![
            instance(PatternKind::DoubleBottom, 10, 30, 0.8, Direction::Bullish),
            instance(PatternKind::HeadAndShoulders, 5, 25, 0.9, Direction::Bearish),
            instance(PatternKind::BullFlag, 60, 70, 0.75, Direction::Bullish),
        ];
        let resolved = PatternOrchestrator::resolve_conflicts(patterns);

        let kinds: Vec<PatternKind> = resolved.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PatternKind::HeadAndShoulders, PatternKind::BullFlag]);
    }

    #[test]
    fn conflicts_do_not_chain_through_intermediate_patterns() {
        // The bullish double bottom beats the only pattern it overlaps. The
        // bear flag beats that same pattern but never touches the double bottom.
        let patterns = vec![
            instance(PatternKind::DoubleBottom, 0, 10, 0.9, Direction::Bullish),
            instance(PatternKind::DoubleTop, 8, 20, 0.5, Direction::Bearish),
            instance(PatternKind::BearFlag, 18, 30, 0.95, Direction::Bearish),
        ];
        let resolved = PatternOrchestrator::resolve_conflicts(patterns);

        let kinds: Vec<PatternKind> = resolved.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PatternKind::DoubleBottom, PatternKind::BearFlag]);
    }

    #[test]
    fn agreeing_overlap_keeps_all_in_end_order() {
        let patterns = vec![
            instance(PatternKind::BullFlag, 12, 40, 0.7, Direction::Bullish),
            instance(PatternKind::DoubleBottom, 10, 30, 0.8, Direction::Bullish),
        ];
        let resolved = PatternOrchestrator::resolve_conflicts(patterns);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].end_index, 30);
        assert_eq!(resolved[1].end_index, 40);
    }

    #[test]
    fn confidence_ties_go_to_most_recent() {
        let patterns = vec![
            instance(PatternKind::RisingWedge, 0, 20, 0.8, Direction::Bearish),
            instance(PatternKind::FallingWedge, 5, 22, 0.8, Direction::Bullish),
        ];
        let resolved = PatternOrchestrator::resolve_conflicts(patterns);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].kind, PatternKind::FallingWedge);
        assert_eq!(
            PatternOrchestrator::strongest(&resolved).map(|p| p.end_index),
            Some(22)
        );
    }

    #[test]
    fn rejects_empty_detector_set() {
        let params = PatternParams {
            enabled: Vec::new(),
            ..PatternParams::default()
        };
        assert!(matches!(
            PatternOrchestrator::new(params),
            Err(PatternError::InvalidParameters(_))
        ));
    }

    #[test]
    fn duplicate_kinds_build_one_detector() {
        let params = PatternParams {
            enabled: vec![PatternKind::DoubleTop, PatternKind::DoubleTop],
            ..PatternParams::default()
        };
        let orchestrator = PatternOrchestrator::new(params).unwrap();
        assert_eq!(orchestrator.kinds(), vec![PatternKind::DoubleTop]);
    }
}
