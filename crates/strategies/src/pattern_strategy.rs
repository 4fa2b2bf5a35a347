use std::sync::Arc;

use configuration::{PatternParams, PatternStrategyParams};
use core_types::{Candle, Side, Signal, StrategyId};
use events::LogSink;
use patterns::{PatternInstance, PatternOrchestrator, PatternWindow};

use crate::error::StrategyError;
use crate::levels::{fixed_stops, target_from_stop};
use crate::{Analysis, Strategy};

const SOURCE: &str = "strategy.patterns";

/// Fraction of the pattern height placed between entry and stop.
const STOP_RANGE_FRACTION: f64 = 0.5;
/// Bullish stops never sit above 1% below the pattern low.
const PATTERN_LOW_BUFFER: f64 = 0.99;

/// Trades the strongest recent chart pattern found by the orchestrator.
///
/// Bullish patterns go long, bearish patterns go short and neutral ones
/// (symmetrical triangles) are reported but not traded.
pub struct PatternStrategy {
    params: PatternStrategyParams,
    orchestrator: PatternOrchestrator,
    log: Arc<dyn LogSink>,
}

impl PatternStrategy {
    pub fn new(
        params: PatternStrategyParams,
        pattern_params: PatternParams,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        let orchestrator = PatternOrchestrator::new(pattern_params)?;
        Ok(Self {
            params,
            orchestrator,
            log,
        })
    }

    pub fn orchestrator(&self) -> &PatternOrchestrator {
        &self.orchestrator
    }

    /// Stop from the pattern geometry, target from the risk-reward ratio.
    fn stops(&self, pattern: &PatternInstance, side: Side, entry: f64) -> (f64, f64) {
        let half_range = pattern.height() * STOP_RANGE_FRACTION;
        let geometric = match side {
            Side::Short => entry + half_range,
            Side::Long => (pattern.low() * PATTERN_LOW_BUFFER).max(entry - half_range),
        };
        let stop = match side {
            Side::Long if geometric < entry => geometric,
            Side::Short if geometric > entry => geometric,
            _ => fixed_stops(side, entry, self.params.stop_loss_pct, self.params.risk_reward).0,
        };
        (stop, target_from_stop(side, entry, stop, self.params.risk_reward))
    }

    fn is_fresh(&self, pattern: &PatternInstance, current_index: usize) -> bool {
        current_index.saturating_sub(pattern.end_index) <= self.params.max_pattern_age
    }
}

impl Strategy for PatternStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Patterns
    }

    fn analyze(&self, window: &[Candle]) -> Result<Analysis, StrategyError> {
        let Some(current) = window.last() else {
            return Ok(Analysis::default());
        };
        let current_index = window.len() - 1;

        let view = PatternWindow::trailing(window, self.params.lookback, self.orchestrator.params());
        let patterns = self.orchestrator.analyze(&view, self.params.min_confidence);

        let tradable: Vec<PatternInstance> = patterns
            .iter()
            .filter(|p| p.direction.side().is_some() && self.is_fresh(p, current_index))
            .cloned()
            .collect();

        let mut signals = Vec::new();
        if let Some(pattern) = PatternOrchestrator::strongest(&tradable) {
            if let Some(side) = pattern.direction.side() {
                let entry = current.close;
                let (stop, target) = self.stops(pattern, side, entry);
                self.log.info(
                    SOURCE,
                    &format!(
                        "{side} signal from {} (confidence {:.2}, entry {entry:.2}, SL {stop:.2}, TP {target:.2})",
                        pattern.kind, pattern.confidence
                    ),
                );
                signals.push(
                    Signal::new(current.timestamp, side, entry, pattern.confidence)
                        .with_pattern(pattern.kind.as_str())
                        .with_stops(stop, target),
                );
            }
        }

        tracing::debug!(
            bar = current_index,
            patterns = patterns.len(),
            signals = signals.len(),
            "Pattern strategy evaluated"
        );
        Ok(Analysis { signals, patterns })
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        Ok(self.analyze(window)?.signals)
    }
}
