//! Stop, target and sizing helpers shared by the strategies.

use core_types::{Candle, Position, Side, to_decimal};

use crate::error::StrategyError;

/// Smallest fraction of equity a strategy ever asks for.
pub const MIN_SIZE_FRACTION: f64 = 0.01;

/// Stop-loss and take-profit a fixed percentage away from `entry`.
pub fn fixed_stops(side: Side, entry: f64, stop_loss_pct: f64, risk_reward: f64) -> (f64, f64) {
    let risk = entry * stop_loss_pct;
    match side {
        Side::Long => (entry - risk, entry + risk * risk_reward),
        Side::Short => (entry + risk, entry - risk * risk_reward),
    }
}

/// Take-profit `risk_reward` times the entry-to-stop distance away from `entry`.
pub fn target_from_stop(side: Side, entry: f64, stop: f64, risk_reward: f64) -> f64 {
    let risk = (entry - stop).abs();
    match side {
        Side::Long => entry + risk * risk_reward,
        Side::Short => entry - risk * risk_reward,
    }
}

/// True when `bar` closed at or through the position's stop-loss or take-profit.
pub fn stops_hit(position: &Position, bar: &Candle) -> Result<bool, StrategyError> {
    Ok(position.stops_hit(to_decimal(bar.close)?))
}

/// Clamps a desired exposure into `(0, 1]`.
pub fn size_fraction(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value.clamp(MIN_SIZE_FRACTION, 1.0)
    } else {
        MIN_SIZE_FRACTION
    }
}

/// The window as it stood at `current_index`.
pub fn history(window: &[Candle], current_index: usize) -> Result<&[Candle], StrategyError> {
    if current_index >= window.len() {
        return Err(StrategyError::IndexOutOfRange {
            index: current_index,
            len: window.len(),
        });
    }
    Ok(&window[..=current_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_stops_bracket_entry() {
        let (stop, target) = fixed_stops(Side::Long, 100.0, 0.02, 2.0);
        assert!((stop - 98.0).abs() < 1e-9);
        assert!((target - 104.0).abs() < 1e-9);

        let (stop, target) = fixed_stops(Side::Short, 100.0, 0.02, 2.0);
        assert!((stop - 102.0).abs() < 1e-9);
        assert!((target - 96.0).abs() < 1e-9);
    }

    #[test]
    fn size_is_always_a_positive_fraction() {
        assert_eq!(size_fraction(0.4), 0.4);
        assert_eq!(size_fraction(3.0), 1.0);
        assert_eq!(size_fraction(0.0), MIN_SIZE_FRACTION);
        assert_eq!(size_fraction(f64::NAN), MIN_SIZE_FRACTION);
    }

    #[test]
    fn history_rejects_future_index() {
        assert!(matches!(
            history(&[], 0),
            Err(StrategyError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }
}
