use std::sync::Arc;

use configuration::MacdParams;
use core_types::{Candle, Position, Side, Signal, StrategyId};
use events::LogSink;

use crate::error::StrategyError;
use crate::indicators::{MacdSeries, closes, macd};
use crate::levels::{fixed_stops, history, size_fraction, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.macd";

/// Commits half the equity fraction a full-confidence signal would.
const BASE_SIZE: f64 = 0.5;

/// MACD / signal-line crossover strategy.
pub struct MacdStrategy {
    params: MacdParams,
    log: Arc<dyn LogSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Bullish,
    Bearish,
}

impl MacdStrategy {
    pub fn new(params: MacdParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn series(&self, window: &[Candle]) -> Result<Option<MacdSeries>, StrategyError> {
        if window.len() < 2 || window.len() < self.params.slow_period {
            return Ok(None);
        }
        let series = macd(
            &closes(window),
            self.params.fast_period,
            self.params.slow_period,
            self.params.signal_period,
        )?;
        Ok(Some(series))
    }

    /// The crossover, if any, on the last bar of the series.
    fn cross(series: &MacdSeries) -> Option<Cross> {
        let n = series.macd.len();
        if n < 2 {
            return None;
        }
        let current = series.macd[n - 1] - series.signal[n - 1];
        let previous = series.macd[n - 2] - series.signal[n - 2];
        if previous <= 0.0 && current > 0.0 {
            Some(Cross::Bullish)
        } else if previous >= 0.0 && current < 0.0 {
            Some(Cross::Bearish)
        } else {
            None
        }
    }
}

impl Strategy for MacdStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Macd
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(series)) = (window.last(), self.series(window)?) else {
            return Ok(Vec::new());
        };
        let Some(cross) = Self::cross(&series) else {
            return Ok(Vec::new());
        };

        let end = series.macd.len() - 1;
        let histogram = series.histogram[end].abs();
        let confidence = (histogram / (series.macd[end].abs() + 1e-9)).min(1.0);
        if histogram < self.params.min_histogram || confidence < self.params.threshold {
            return Ok(Vec::new());
        }

        let (side, label) = match cross {
            Cross::Bullish => (Side::Long, "macd_bullish_cross"),
            Cross::Bearish => (Side::Short, "macd_bearish_cross"),
        };
        let (stop, target) = fixed_stops(
            side,
            current.close,
            self.params.stop_loss_pct,
            self.params.risk_reward,
        );
        self.log.info(
            SOURCE,
            &format!("{side} signal generated with confidence {confidence:.2}"),
        );
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence)
                .with_pattern(label)
                .with_stops(stop, target),
        ])
    }

    /// Exits on the opposite crossover.
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
        let Some(series) = self.series(history)? else {
            return Ok(false);
        };
        Ok(matches!(
            (position.side, Self::cross(&series)),
            (Side::Long, Some(Cross::Bearish)) | (Side::Short, Some(Cross::Bullish))
        ))
    }

    fn calculate_position_size(&self, _window: &[Candle], signal: &Signal) -> f64 {
        size_fraction(BASE_SIZE * signal.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candles, path, position};
    use events::MemorySink;

    fn strategy(params: MacdParams) -> MacdStrategy {
        MacdStrategy::new(params, Arc::new(MemorySink::new())).unwrap()
    }

    /// Scans forward for the first bar whose window produces a signal.
    fn first_signal(strategy: &MacdStrategy, data: &[Candle]) -> Option<(usize, Signal)> {
        (1..=data.len()).find_map(|end| {
            strategy
                .generate_signals(&data[..end])
                .unwrap()
                .into_iter()
                .next()
                .map(|s| (end - 1, s))
        })
    }

    #[test]
    fn reversal_after_decline_crosses_bullish() {
        let data = candles(&path(&[(0, 150.0), (40, 100.0), (60, 130.0)]));
        let params = MacdParams {
            threshold: 0.0,
            ..MacdParams::default()
        };
        let (index, signal) = first_signal(&strategy(params), &data).expect("bullish cross");
        assert!(index > 40);
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.pattern.as_deref(), Some("macd_bullish_cross"));
    }

    #[test]
    fn histogram_floor_suppresses_weak_crosses() {
        let data = candles(&path(&[(0, 150.0), (40, 100.0), (60, 130.0)]));
        let params = MacdParams {
            threshold: 0.0,
            min_histogram: 1_000.0,
            ..MacdParams::default()
        };
        assert!(first_signal(&strategy(params), &data).is_none());
    }

    #[test]
    fn size_is_half_confidence() {
        let strategy = strategy(MacdParams::default());
        let data = candles(&[100.0]);
        let signal = Signal::new(data[0].timestamp, Side::Long, 100.0, 0.8);
        assert!((strategy.calculate_position_size(&data, &signal) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn long_exits_on_bearish_cross() {
        let data = candles(&path(&[(0, 100.0), (40, 150.0), (60, 120.0)]));
        let strategy = strategy(MacdParams::default());
        let long = position(Side::Long, 100.0, 1.0, 1_000.0);

        let exit = (26..data.len()).find(|&i| strategy.should_exit(&data, i, &long).unwrap());
        assert!(matches!(exit, Some(i) if i > 40));
    }
}
