use std::sync::Arc;

use configuration::EmaTrendParams;
use core_types::{Candle, Position, Side, Signal, StrategyId};
use events::LogSink;

use crate::error::StrategyError;
use crate::indicators::{closes, ema, forward_fill, rolling_quantile_at, slope_at};
use crate::levels::{history, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.ema_trend";

/// Four-EMA alignment strategy.
///
/// Goes long when EMA fast > medium > slow > baseline, short on the reverse,
/// but only while the fast/baseline spread sits inside its own recent
/// distribution (neither compressed nor overextended).
pub struct EmaTrend {
    params: EmaTrendParams,
    log: Arc<dyn LogSink>,
}

/// Indicator values at the last bar of a window.
#[derive(Debug, Clone, Copy)]
struct Reading {
    /// Fast, medium, slow, baseline.
    emas: [f64; 4],
    slopes: [f64; 4],
    spread: f64,
    lower_bound: f64,
    upper_bound: f64,
}

impl Reading {
    fn uptrend(&self) -> bool {
        let [fast, medium, slow, baseline] = self.emas;
        fast > medium && medium > slow && slow > baseline
    }

    fn downtrend(&self) -> bool {
        let [fast, medium, slow, baseline] = self.emas;
        baseline > slow && slow > medium && medium > fast
    }

    /// The fast EMA is already turning against an otherwise rising stack.
    fn avoid_long(&self) -> bool {
        self.uptrend() && self.slopes[0] < 0.0 && self.slopes[1..].iter().all(|s| *s > 0.0)
    }

    fn spread_in_range(&self) -> bool {
        self.lower_bound <= self.spread && self.spread <= self.upper_bound
    }

    fn confidence(&self) -> f64 {
        if self.uptrend() {
            0.5 + if self.slopes.iter().all(|s| *s > 0.0) { 0.5 } else { 0.0 }
        } else if self.downtrend() {
            0.5 + if self.slopes.iter().all(|s| *s < 0.0) { 0.5 } else { 0.0 }
        } else {
            0.0
        }
    }
}

impl EmaTrend {
    pub fn new(params: EmaTrendParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn periods(&self) -> [usize; 4] {
        [
            self.params.fast_period,
            self.params.medium_period,
            self.params.slow_period,
            self.params.baseline_period,
        ]
    }

    fn required_bars(&self) -> usize {
        self.params
            .baseline_period
            .max(self.params.percentile_window)
            .max(self.params.slope_window)
    }

    fn read(&self, window: &[Candle]) -> Result<Option<Reading>, StrategyError> {
        if window.len() < self.required_bars() {
            return Ok(None);
        }
        let closes = closes(window);
        let end = closes.len() - 1;

        let mut series = Vec::with_capacity(4);
        for period in self.periods() {
            series.push(ema(&closes, period)?);
        }
        let (fast, baseline) = (&series[0], &series[3]);

        let spread: Vec<f64> = fast
            .iter()
            .zip(baseline)
            .map(|(f, b)| ((f - b) / b).abs() * 100.0)
            .collect();
        let spread = forward_fill(&spread);

        let window_len = self.params.percentile_window;
        let (Some(lower_bound), Some(upper_bound)) = (
            rolling_quantile_at(&spread, end, window_len, self.params.lower_quantile),
            rolling_quantile_at(&spread, end, window_len, self.params.upper_quantile),
        ) else {
            return Ok(None);
        };

        let mut slopes = [0.0; 4];
        for (slope, values) in slopes.iter_mut().zip(&series) {
            match slope_at(values, end, self.params.slope_window) {
                Some(value) => *slope = value,
                None => return Ok(None),
            }
        }

        Ok(Some(Reading {
            emas: [fast[end], series[1][end], series[2][end], baseline[end]],
            slopes,
            spread: spread[end],
            lower_bound,
            upper_bound,
        }))
    }
}

impl Strategy for EmaTrend {
    fn id(&self) -> StrategyId {
        StrategyId::EmaTrend
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(reading)) = (window.last(), self.read(window)?) else {
            return Ok(Vec::new());
        };

        if !reading.spread_in_range() {
            tracing::debug!(
                spread = reading.spread,
                lower = reading.lower_bound,
                upper = reading.upper_bound,
                "EMA spread outside its balance range"
            );
            return Ok(Vec::new());
        }

        let (side, label) = if reading.uptrend() && !reading.avoid_long() {
            (Side::Long, "bullish_ema_alignment")
        } else if reading.downtrend() {
            (Side::Short, "bearish_ema_alignment")
        } else {
            return Ok(Vec::new());
        };

        let confidence = reading.confidence();
        if confidence < self.params.threshold {
            return Ok(Vec::new());
        }

        self.log.info(
            SOURCE,
            &format!("{side} signal generated with confidence {confidence:.2}"),
        );
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence).with_pattern(label),
        ])
    }

    /// Exits when the close crosses the baseline EMA by more than the buffer.
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

        let baseline = ema(&closes(history), self.params.baseline_period)?;
        let Some(&baseline) = baseline.last() else {
            return Ok(false);
        };
        let buffer = self.params.baseline_buffer;
        Ok(match position.side {
            Side::Long => bar.close <= baseline * (1.0 - buffer),
            Side::Short => bar.close >= baseline * (1.0 + buffer),
        })
    }
}
