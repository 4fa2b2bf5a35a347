use std::sync::Arc;

use configuration::RsiParams;
use core_types::{Candle, Position, Side, Signal, StrategyId};
use events::LogSink;

use crate::error::StrategyError;
use crate::indicators::{closes, rsi};
use crate::levels::{fixed_stops, history, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.rsi";

/// Buys oversold and sells overbought RSI readings.
pub struct RsiStrategy {
    params: RsiParams,
    log: Arc<dyn LogSink>,
}

impl RsiStrategy {
    pub fn new(params: RsiParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn current_rsi(&self, window: &[Candle]) -> Result<Option<f64>, StrategyError> {
        if window.len() <= self.params.period {
            return Ok(None);
        }
        Ok(rsi(&closes(window), self.params.period)?.last().copied())
    }

    /// 0.5 at the level itself, rising to 1.0 at the scale's extreme.
    fn confidence(&self, side: Side, value: f64) -> f64 {
        let depth = match side {
            Side::Long => (self.params.oversold - value) / self.params.oversold,
            Side::Short => (value - self.params.overbought) / (100.0 - self.params.overbought),
        };
        0.5 + 0.5 * depth.clamp(0.0, 1.0)
    }
}

impl Strategy for RsiStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Rsi
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(value)) = (window.last(), self.current_rsi(window)?) else {
            return Ok(Vec::new());
        };

        let (side, label) = if value <= self.params.oversold {
            (Side::Long, "rsi_oversold")
        } else if value >= self.params.overbought {
            (Side::Short, "rsi_overbought")
        } else {
            return Ok(Vec::new());
        };

        let confidence = self.confidence(side, value);
        if confidence < self.params.threshold {
            return Ok(Vec::new());
        }

        let (stop, target) = fixed_stops(
            side,
            current.close,
            self.params.stop_loss_pct,
            self.params.risk_reward,
        );
        self.log.info(SOURCE, &format!("{side} signal at RSI {value:.1}"));
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence)
                .with_pattern(label)
                .with_stops(stop, target),
        ])
    }

    /// Exits at the opposite extreme.
    fn should_exit(
        &self,
        window: &[Candle],
        current_index: usize,
        position: &Position,
    ) -> Result<bool, StrategyError> {
        let history = history(window, current_index)?;
        let Some(bar) = history.last() else {
            return Ok(false);
        };
        if stops_hit(position, bar)? {
            return Ok(true);
        }
        let Some(value) = self.current_rsi(history)? else {
            return Ok(false);
        };
        Ok(match position.side {
            Side::Long => value >= self.params.overbought,
            Side::Short => value <= self.params.oversold,
        })
    }
}
