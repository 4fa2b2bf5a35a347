use std::fmt;
use std::sync::Arc;

use configuration::TrendAnalysisParams;
use core_types::{Candle, Position, Side, Signal, StrategyId};
use events::LogSink;
use serde::Serialize;

use crate::error::StrategyError;
use crate::indicators::{closes, ema, last_slope, tail};
use crate::levels::{fixed_stops, history, size_fraction, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.trend_analysis";

const BASE_CONFIDENCE: f64 = 0.6;
const BASE_SIZE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongBullish,
    WeakBullish,
    Neutral,
    WeakBearish,
    StrongBearish,
}

impl Trend {
    pub fn side(&self) -> Option<Side> {
        match self {
            Trend::StrongBullish | Trend::WeakBullish => Some(Side::Long),
            Trend::StrongBearish | Trend::WeakBearish => Some(Side::Short),
            Trend::Neutral => None,
        }
    }

    pub fn is_bearish(&self) -> bool {
        self.side() == Some(Side::Short)
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, Trend::StrongBullish | Trend::StrongBearish)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::StrongBullish => "strong bullish",
            Trend::WeakBullish => "weak bullish",
            Trend::Neutral => "neutral",
            Trend::WeakBearish => "weak bearish",
            Trend::StrongBearish => "strong bearish",
        };
        f.write_str(label)
    }
}

/// Trend classification at the last bar of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendReading {
    pub trend: Trend,
    /// Every EMA is rising.
    pub slopes_bullish: bool,
    /// Every EMA is falling.
    pub slopes_bearish: bool,
    /// Relative close change over the lookback.
    pub momentum: f64,
}

impl TrendReading {
    pub fn slopes_agree(&self) -> bool {
        match self.trend.side() {
            Some(Side::Long) => self.slopes_bullish,
            Some(Side::Short) => self.slopes_bearish,
            None => false,
        }
    }
}

/// Classifies the trend from the ordering of three EMAs, their slopes and
/// where the close sits relative to them.
///
/// A stacked ordering (fast above medium above slow, or the reverse) is a weak
/// trend; it becomes strong when the close leads the stack and every EMA
/// slopes the same way. Returns `None` until the slow EMA has a full period.
pub fn classify_trend(
    window: &[Candle],
    params: &TrendAnalysisParams,
) -> Result<Option<TrendReading>, StrategyError> {
    let [fast_period, medium_period, slow_period] = params.ema_periods;
    if window.len() < slow_period.max(params.slope_period) {
        return Ok(None);
    }
    let closes = closes(window);
    let Some(&close) = closes.last() else {
        return Ok(None);
    };

    let mut values = [0.0; 3];
    let mut slopes = [0.0; 3];
    for (i, period) in [fast_period, medium_period, slow_period].into_iter().enumerate() {
        let series = ema(&closes, period)?;
        let (Some(&value), Some(slope)) = (series.last(), last_slope(&series, params.slope_period))
        else {
            return Ok(None);
        };
        values[i] = value;
        slopes[i] = slope;
    }
    let [fast, medium, slow] = values;

    let slopes_bullish = slopes.iter().all(|s| *s > 0.0);
    let slopes_bearish = slopes.iter().all(|s| *s < 0.0);

    let trend = if fast > medium && medium > slow {
        if close > fast && slopes_bullish {
            Trend::StrongBullish
        } else {
            Trend::WeakBullish
        }
    } else if fast < medium && medium < slow {
        if close < fast && slopes_bearish {
            Trend::StrongBearish
        } else {
            Trend::WeakBearish
        }
    } else {
        Trend::Neutral
    };

    let recent = tail(&closes, params.lookback);
    let momentum = match recent.first() {
        Some(&first) if first != 0.0 => (close - first) / first,
        _ => 0.0,
    };

    Ok(Some(TrendReading {
        trend,
        slopes_bullish,
        slopes_bearish,
        momentum,
    }))
}

/// Follows stacked EMA trends, favouring strong trends with momentum.
pub struct TrendAnalysis {
    params: TrendAnalysisParams,
    log: Arc<dyn LogSink>,
}

impl TrendAnalysis {
    pub fn new(params: TrendAnalysisParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn is_trending(&self, reading: &TrendReading) -> bool {
        reading.momentum.abs() > self.params.momentum_threshold
    }

    fn confidence(&self, reading: &TrendReading) -> f64 {
        let strength = if reading.trend.is_strong() { 1.2 } else { 0.9 };
        let momentum = if self.is_trending(reading) { 1.1 } else { 1.0 };
        (BASE_CONFIDENCE * strength * momentum).min(1.0)
    }
}

impl Strategy for TrendAnalysis {
    fn id(&self) -> StrategyId {
        StrategyId::TrendAnalysis
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(reading)) = (window.last(), classify_trend(window, &self.params)?)
        else {
            return Ok(Vec::new());
        };
        let Some(side) = reading.trend.side() else {
            return Ok(Vec::new());
        };

        let confidence = self.confidence(&reading);
        if confidence < self.params.threshold {
            return Ok(Vec::new());
        }

        let label = match side {
            Side::Long => "uptrend",
            Side::Short => "downtrend",
        };
        let (stop, target) = fixed_stops(
            side,
            current.close,
            self.params.stop_loss_pct,
            self.params.risk_reward,
        );
        self.log.info(
            SOURCE,
            &format!(
                "{side} signal in {} trend (momentum {:.3}, confidence {confidence:.2})",
                reading.trend, reading.momentum
            ),
        );
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence)
                .with_pattern(label)
                .with_stops(stop, target),
        ])
    }

    /// Exits as soon as the trend flips against the position.
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
        let Some(reading) = classify_trend(history, &self.params)? else {
            return Ok(false);
        };
        Ok(reading.trend.side() == Some(position.side.opposite()))
    }

    fn calculate_position_size(&self, window: &[Candle], signal: &Signal) -> f64 {
        let Ok(Some(reading)) = classify_trend(window, &self.params) else {
            return size_fraction(BASE_SIZE * signal.confidence);
        };
        let strength = if reading.trend.is_strong() { 1.2 } else { 0.8 };
        let alignment = if reading.slopes_agree() { 1.1 } else { 1.0 };
        size_fraction(BASE_SIZE * strength * alignment * signal.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candles, position};
    use events::MemorySink;

    fn params() -> TrendAnalysisParams {
        TrendAnalysisParams {
            ema_periods: [5, 10, 20],
            ..TrendAnalysisParams::default()
        }
    }

    fn strategy() -> TrendAnalysis {
        TrendAnalysis::new(params(), Arc::new(MemorySink::new())).unwrap()
    }

    fn compounding(start: f64, rate: f64, bars: i32) -> Vec<f64> {
        (0..bars).map(|i| start * rate.powi(i)).collect()
    }

    #[test]
    fn steady_rise_is_strong_bullish() {
        let data = candles(&compounding(100.0, 1.01, 60));
        let reading = classify_trend(&data, &params()).unwrap().unwrap();
        assert_eq!(reading.trend, Trend::StrongBullish);
        assert!(reading.slopes_bullish && reading.slopes_agree());
        assert!(reading.momentum > 0.05);
    }

    #[test]
    fn steady_fall_is_strong_bearish() {
        let data = candles(&compounding(100.0, 0.99, 60));
        let reading = classify_trend(&data, &params()).unwrap().unwrap();
        assert_eq!(reading.trend, Trend::StrongBearish);
        assert!(reading.trend.is_bearish());
    }

    #[test]
    fn flat_market_is_neutral() {
        let data = candles(&vec![100.0; 60]);
        let reading = classify_trend(&data, &params()).unwrap().unwrap();
        assert_eq!(reading.trend, Trend::Neutral);
        assert!(strategy().generate_signals(&data).unwrap().is_empty());
    }

    #[test]
    fn short_history_is_unclassified() {
        let data = candles(&compounding(100.0, 1.01, 10));
        assert!(classify_trend(&data, &params()).unwrap().is_none());
    }

    #[test]
    fn strong_trend_with_momentum_goes_long() {
        let data = candles(&compounding(100.0, 1.01, 60));
        let strategy = strategy();
        let signals = strategy.generate_signals(&data).unwrap();
        assert_eq!(signals.len(), 1);

        let signal = &signals[0];
        assert_eq!(signal.side, Side::Long);
        assert!((signal.confidence - 0.6 * 1.2 * 1.1).abs() < 1e-12);

        let size = strategy.calculate_position_size(&data, signal);
        assert!((size - 0.5 * 1.2 * 1.1 * signal.confidence).abs() < 1e-12);
    }

    #[test]
    fn long_exits_when_trend_turns_bearish() {
        let mut closes = compounding(100.0, 1.01, 40);
        let peak = closes[39];
        closes.extend((1..=40).map(|i| peak * 0.99f64.powi(i)));
        let data = candles(&closes);
        let strategy = strategy();
        let long = position(Side::Long, 100.0, 1.0, 10_000.0);

        assert!(!strategy.should_exit(&data, 39, &long).unwrap());
        assert!(strategy.should_exit(&data, 79, &long).unwrap());
    }
}
