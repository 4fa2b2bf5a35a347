use std::sync::Arc;

use configuration::ObvParams;
use core_types::{Candle, Direction, Position, Side, Signal, StrategyId};
use events::LogSink;
use patterns::geometry::mean;

use crate::error::StrategyError;
use crate::indicators::{closes, last_slope, obv, sma, tail, volumes};
use crate::levels::{fixed_stops, history, size_fraction, stops_hit};
use crate::Strategy;

const SOURCE: &str = "strategy.obv";

/// Up/down volume ratios beyond these count as a strong or weak tape.
const STRONG_TREND: f64 = 1.5;
const WEAK_TREND: f64 = 0.67;

const BASE_SIZE: f64 = 0.5;
const MAX_VOLUME_MULTIPLIER: f64 = 1.5;

/// Price / on-balance-volume divergence confirmed by a volume surge.
pub struct ObvStrategy {
    params: ObvParams,
    log: Arc<dyn LogSink>,
}

/// Volume statistics over the trailing `volume_lookback` bars.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VolumeProfile {
    /// Current volume over the average.
    ratio: f64,
    /// Volume on up closes over volume on down closes.
    trend: f64,
}

impl VolumeProfile {
    fn trend_multiplier(&self) -> f64 {
        if self.trend > STRONG_TREND {
            1.2
        } else if self.trend < WEAK_TREND {
            0.8
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    divergence: Option<Direction>,
    volume: VolumeProfile,
}

impl ObvStrategy {
    pub fn new(params: ObvParams, log: Arc<dyn LogSink>) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, log })
    }

    fn required_bars(&self) -> usize {
        let averages = self.params.ma_period.max(self.params.obv_ma_period);
        (averages + self.params.slope_period).max(self.params.volume_lookback + 1)
    }

    /// Price rising while OBV falls is bearish, and the reverse bullish.
    ///
    /// Both slopes are relative: the price slope to the price average and the
    /// OBV slope to the average volume.
    fn divergence(&self, price_slope: f64, obv_slope: f64) -> Option<Direction> {
        if (price_slope - obv_slope).abs() < self.params.divergence_threshold {
            return None;
        }
        if price_slope > 0.0 && obv_slope < 0.0 {
            Some(Direction::Bearish)
        } else if price_slope < 0.0 && obv_slope > 0.0 {
            Some(Direction::Bullish)
        } else {
            None
        }
    }

    fn volume_profile(&self, window: &[Candle]) -> VolumeProfile {
        let lookback = self.params.volume_lookback;
        let recent = &window[window.len().saturating_sub(lookback + 1)..];
        let volumes = volumes(recent);
        let last = tail(&volumes, lookback);

        let ratio = match (mean(last), last.last()) {
            (Some(average), Some(current)) if average > 0.0 => current / average,
            _ => 0.0,
        };

        let (mut up, mut down) = (0.0, 0.0);
        for pair in recent.windows(2) {
            if pair[1].close > pair[0].close {
                up += pair[1].volume;
            } else if pair[1].close < pair[0].close {
                down += pair[1].volume;
            }
        }
        VolumeProfile {
            ratio,
            trend: up / (down + 1e-9),
        }
    }

    fn read(&self, window: &[Candle]) -> Result<Option<Reading>, StrategyError> {
        if window.len() < self.required_bars() {
            return Ok(None);
        }
        let price_ma = sma(&closes(window), self.params.ma_period)?;
        let obv_ma = sma(&obv(window)?, self.params.obv_ma_period)?;

        let volume = self.volume_profile(window);
        let average_volume = mean(tail(&volumes(window), self.params.volume_lookback)).unwrap_or(0.0);
        let (Some(price_slope), Some(obv_slope), Some(&price_level)) = (
            last_slope(&price_ma, self.params.slope_period),
            last_slope(&obv_ma, self.params.slope_period),
            price_ma.last(),
        ) else {
            return Ok(None);
        };
        if price_level <= 0.0 || average_volume <= 0.0 {
            return Ok(None);
        }

        Ok(Some(Reading {
            divergence: self.divergence(price_slope / price_level, obv_slope / average_volume),
            volume,
        }))
    }

    fn confidence(&self, volume: &VolumeProfile) -> f64 {
        let base = (volume.ratio / self.params.volume_threshold).min(1.0);
        (base * volume.trend_multiplier()).min(1.0)
    }

    fn is_high_volume(&self, volume: &VolumeProfile) -> bool {
        volume.ratio > self.params.volume_threshold
    }
}

impl Strategy for ObvStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::Obv
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(reading)) = (window.last(), self.read(window)?) else {
            return Ok(Vec::new());
        };
        if !self.is_high_volume(&reading.volume) {
            return Ok(Vec::new());
        }

        let (side, label) = match reading.divergence {
            Some(Direction::Bullish) => (Side::Long, "obv_bullish_divergence"),
            Some(Direction::Bearish) => (Side::Short, "obv_bearish_divergence"),
            _ => return Ok(Vec::new()),
        };

        let confidence = self.confidence(&reading.volume);
        if confidence < self.params.threshold {
            return Ok(Vec::new());
        }

        let (stop, target) = fixed_stops(
            side,
            current.close,
            self.params.stop_loss_pct,
            self.params.risk_reward,
        );
        self.log.info(
            SOURCE,
            &format!(
                "{side} divergence with volume ratio {:.2} (confidence {confidence:.2})",
                reading.volume.ratio
            ),
        );
        Ok(vec![
            Signal::new(current.timestamp, side, current.close, confidence)
                .with_pattern(label)
                .with_stops(stop, target),
        ])
    }

    /// Exits on an opposite divergence backed by high volume flowing against the position.
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
        let high_volume = self.is_high_volume(&reading.volume);
        Ok(match position.side {
            Side::Long => {
                high_volume
                    && reading.divergence == Some(Direction::Bearish)
                    && reading.volume.trend < WEAK_TREND
            }
            Side::Short => {
                high_volume
                    && reading.divergence == Some(Direction::Bullish)
                    && reading.volume.trend > STRONG_TREND
            }
        })
    }

    /// Scales with the volume surge and the up/down volume balance.
    fn calculate_position_size(&self, window: &[Candle], signal: &Signal) -> f64 {
        if window.is_empty() {
            return size_fraction(BASE_SIZE * signal.confidence);
        }
        let volume = self.volume_profile(window);
        let volume_multiplier =
            (volume.ratio / self.params.volume_threshold).min(MAX_VOLUME_MULTIPLIER);
        size_fraction(BASE_SIZE * volume_multiplier * volume.trend_multiplier() * signal.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_volumes;
    use events::MemorySink;

    fn strategy() -> ObvStrategy {
        ObvStrategy::new(ObvParams::default(), Arc::new(MemorySink::new())).unwrap()
    }

    /// Price grinds higher on shrinking up-volume while down bars carry heavy
    /// volume, then the last bar prints a volume spike.
    fn bearish_divergence() -> Vec<Candle> {
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        let mut price = 100.0;
        for i in 0..40 {
            if i % 3 == 2 {
                price -= 0.5;
                volumes.push(3_000.0);
            } else {
                price += 1.0;
                volumes.push(500.0);
            }
            closes.push(price);
        }
        price -= 0.5;
        closes.push(price);
        volumes.push(6_000.0);
        with_volumes(&closes, &volumes)
    }

    #[test]
    fn divergence_classification() {
        let strategy = strategy();
        assert_eq!(strategy.divergence(0.01, -0.5), Some(Direction::Bearish));
        assert_eq!(strategy.divergence(-0.01, 0.5), Some(Direction::Bullish));
        assert_eq!(strategy.divergence(0.01, 0.05), None);
        assert_eq!(strategy.divergence(0.01, -0.01), None);
    }

    #[test]
    fn volume_profile_measures_surge_and_balance() {
        let data = bearish_divergence();
        let profile = strategy().volume_profile(&data);
        assert!(profile.ratio > 1.5);
        assert!(profile.trend < WEAK_TREND);
    }

    #[test]
    fn rising_price_with_distribution_goes_short() {
        let data = bearish_divergence();
        let signals = strategy().generate_signals(&data).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].side, Side::Short);
        assert!(signals[0].confidence >= 0.6);
    }

    #[test]
    fn quiet_volume_never_signals() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let data = with_volumes(&closes, &vec![1_000.0; 40]);
        assert!(strategy().generate_signals(&data).unwrap().is_empty());
    }
}
