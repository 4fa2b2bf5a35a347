use std::sync::Arc;

use configuration::VolatilityParams;
use core_types::{Candle, Position, Side, Signal, StrategyId};
use events::LogSink;
use patterns::geometry::mean;

use crate::error::StrategyError;
use crate::indicators::{atr, bollinger, closes, std_dev, tail};
use crate::levels::{fixed_stops, history, size_fraction, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.volatility";

const BASE_SIZE: f64 = 0.5;
/// Band position beyond which a squeezed market is faded.
const UPPER_EXTREME: f64 = 0.9;
const LOWER_EXTREME: f64 = 0.1;
const MEAN_REVERSION_DISCOUNT: f64 = 0.8;

/// Trades Bollinger breakouts on expanding volatility and fades the band
/// edges while volatility is compressed.
pub struct VolatilityStrategy {
    params: VolatilityParams,
    log: Arc<dyn LogSink>,
}

/// Volatility state at the last bar of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reading {
    /// Short-horizon over long-horizon standard deviation of bar ranges.
    vol_ratio: f64,
    /// Current band width over its recent average.
    squeeze_ratio: f64,
    /// Current bar range over ATR.
    range_ratio: f64,
    /// 0 at the lower band, 1 at the upper band.
    bb_position: f64,
    breakout: Option<Side>,
    close: f64,
    middle: f64,
}

impl VolatilityStrategy {
    pub fn new(params: VolatilityParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn required_bars(&self) -> usize {
        let lookback = self.params.vol_lookback;
        (3 * lookback)
            .max(self.params.bb_period + lookback)
            .max(self.params.atr_period)
    }

    fn read(&self, window: &[Candle]) -> Result<Option<Reading>, StrategyError> {
        if window.len() < self.required_bars().max(2) {
            return Ok(None);
        }
        let end = window.len() - 1;
        let lookback = self.params.vol_lookback;

        let ranges: Vec<f64> = window.iter().map(Candle::range).collect();
        let vol_ratio = match (
            std_dev(tail(&ranges, lookback)),
            std_dev(tail(&ranges, 3 * lookback)),
        ) {
            (Some(short), Some(long)) if long > 0.0 => short / long,
            _ => 1.0,
        };

        let closes = closes(window);
        let bands = bollinger(&closes, self.params.bb_period, self.params.bb_std_dev)?;
        let widths: Vec<f64> = bands
            .upper
            .iter()
            .zip(&bands.lower)
            .zip(&bands.middle)
            .map(|((u, l), m)| if *m != 0.0 { (u - l) / m } else { 0.0 })
            .collect();
        let squeeze_ratio = match mean(tail(&widths, lookback)) {
            Some(average) if average > 0.0 => widths[end] / average,
            _ => 1.0,
        };

        let atr = atr(window, self.params.atr_period)?;
        let range_ratio = if atr[end] > 0.0 {
            ranges[end] / atr[end]
        } else {
            0.0
        };

        let band_width = bands.upper[end] - bands.lower[end];
        let bb_position = if band_width > 0.0 {
            (closes[end] - bands.lower[end]) / band_width
        } else {
            0.5
        };

        let breakout = if closes[end] > bands.upper[end] && closes[end - 1] <= bands.upper[end - 1] {
            Some(Side::Long)
        } else if closes[end] < bands.lower[end] && closes[end - 1] >= bands.lower[end - 1] {
            Some(Side::Short)
        } else {
            None
        };

        Ok(Some(Reading {
            vol_ratio,
            squeeze_ratio,
            range_ratio,
            bb_position,
            breakout,
            close: closes[end],
            middle: bands.middle[end],
        }))
    }

    fn is_high_volatility(&self, reading: &Reading) -> bool {
        reading.vol_ratio > self.params.vol_threshold
    }

    fn is_squeeze(&self, reading: &Reading) -> bool {
        reading.squeeze_ratio < self.params.squeeze_threshold
    }

    fn score(&self, reading: &Reading) -> f64 {
        let mut score = (reading.vol_ratio / self.params.vol_threshold).min(1.0);
        if reading.range_ratio > self.params.range_threshold {
            score *= 1.2;
        }
        if self.is_squeeze(reading) {
            score *= 1.1;
        }
        score.min(1.0)
    }

    /// Side, label and confidence of the trade the reading calls for.
    fn entry(&self, reading: &Reading) -> Option<(Side, &'static str, f64)> {
        let squeeze = self.is_squeeze(reading);
        let (side, label, confidence) = match reading.breakout {
            Some(side) if self.is_high_volatility(reading) || squeeze => {
                let label = match side {
                    Side::Long => "volatility_breakout_up",
                    Side::Short => "volatility_breakout_down",
                };
                (side, label, self.score(reading))
            }
            None if squeeze && reading.bb_position > UPPER_EXTREME => (
                Side::Short,
                "volatility_squeeze_fade",
                self.score(reading) * MEAN_REVERSION_DISCOUNT,
            ),
            None if squeeze && reading.bb_position < LOWER_EXTREME => (
                Side::Long,
                "volatility_squeeze_fade",
                self.score(reading) * MEAN_REVERSION_DISCOUNT,
            ),
            _ => return None,
        };
        (confidence >= self.params.threshold).then_some((side, label, confidence))
    }
}

impl Strategy for VolatilityStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Volatility
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(reading)) = (window.last(), self.read(window)?) else {
            return Ok(Vec::new());
        };
        let Some((side, label, confidence)) = self.entry(&reading) else {
            return Ok(Vec::new());
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
                "{side} {label} (vol ratio {:.2}, squeeze {:.2}, confidence {confidence:.2})",
                reading.vol_ratio, reading.squeeze_ratio
            ),
        );
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence)
                .with_pattern(label)
                .with_stops(stop, target),
        ])
    }

    /// Exits once volatility fades or the close falls back through the middle band.
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
        let Some(reading) = self.read(history)? else {
            return Ok(false);
        };
        if reading.vol_ratio < self.params.exit_vol_ratio {
            return Ok(true);
        }
        Ok(match position.side {
            Side::Long => reading.close < reading.middle,
            Side::Short => reading.close > reading.middle,
        })
    }

    /// Smaller in violent markets, larger out of a squeeze.
    fn calculate_position_size(&self, window: &[Candle], signal: &Signal) -> f64 {
        let Ok(Some(reading)) = self.read(window) else {
            return size_fraction(BASE_SIZE * signal.confidence);
        };
        let regime = if self.is_high_volatility(&reading) {
            0.8
        } else if self.is_squeeze(&reading) {
            1.2
        } else {
            1.0
        };
        let range = if reading.range_ratio > self.params.range_threshold {
            1.2
        } else {
            0.8
        };
        size_fraction(BASE_SIZE * regime * range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use crate::test_support::position;
    use events::MemorySink;

    fn strategy() -> VolatilityStrategy {
        VolatilityStrategy::new(VolatilityParams::default(), Arc::new(MemorySink::new())).unwrap()
    }

    fn bar(i: usize, close: f64, high: f64, low: f64) -> Candle {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(start + Duration::hours(i as i64), close, high, low, close, 1_000.0)
    }

    /// Sixty bars chopping between 100 and 100.5 with ranges of 1.0 to 1.2.
    fn calm() -> Vec<Candle> {
        (0..60)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 100.5 };
                let half = (1.0 + 0.1 * (i % 3) as f64) / 2.0;
                bar(i, close, close + half, close - half)
            })
            .collect()
    }

    fn breakout() -> Vec<Candle> {
        let mut data = calm();
        data.push(bar(60, 106.0, 107.0, 100.0));
        data
    }

    fn reading(breakout: Option<Side>, vol_ratio: f64, squeeze_ratio: f64, bb_position: f64) -> Reading {
        Reading {
            vol_ratio,
            squeeze_ratio,
            range_ratio: 1.0,
            bb_position,
            breakout,
            close: 100.0,
            middle: 100.0,
        }
    }

    #[test]
    fn range_expansion_through_upper_band_goes_long() {
        let data = breakout();
        let signals = strategy().generate_signals(&data).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].side, Side::Long);
        assert_eq!(signals[0].pattern.as_deref(), Some("volatility_breakout_up"));
        assert_eq!(signals[0].confidence, 1.0);
    }

    #[test]
    fn calm_market_is_silent() {
        assert!(strategy().generate_signals(&calm()).unwrap().is_empty());
    }

    #[test]
    fn breakout_size_is_trimmed_for_high_volatility() {
        let data = breakout();
        let strategy = strategy();
        let signal = strategy.generate_signals(&data).unwrap().remove(0);
        let size = strategy.calculate_position_size(&data, &signal);
        assert!((size - 0.5 * 0.8 * 1.2).abs() < 1e-12);
    }

    #[test]
    fn squeeze_fades_band_extremes() {
        let strategy = strategy();
        let (side, label, confidence) = strategy.entry(&reading(None, 1.5, 0.5, 0.95)).unwrap();
        assert_eq!(side, Side::Short);
        assert_eq!(label, "volatility_squeeze_fade");
        // min(1.5 / 1.5, 1) * 1.2 * 1.1 capped at 1, then discounted.
        assert!((confidence - 0.8).abs() < 1e-12);

        let (side, _, _) = strategy.entry(&reading(None, 1.5, 0.5, 0.05)).unwrap();
        assert_eq!(side, Side::Long);
        assert!(strategy.entry(&reading(None, 1.5, 0.5, 0.5)).is_none());
    }

    #[test]
    fn breakout_without_expansion_or_squeeze_is_ignored() {
        assert!(strategy().entry(&reading(Some(Side::Long), 1.0, 1.0, 1.1)).is_none());
    }

    #[test]
    fn long_exits_when_price_falls_back_inside() {
        let mut data = breakout();
        data.push(bar(61, 100.0, 100.5, 99.5));
        let strategy = strategy();
        let long = position(Side::Long, 106.0, 50.0, 200.0);

        assert!(!strategy.should_exit(&data, 60, &long).unwrap());
        assert!(strategy.should_exit(&data, 61, &long).unwrap());
    }
}
