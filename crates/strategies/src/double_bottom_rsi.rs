use std::sync::Arc;

use configuration::{DoubleBottomRsiParams, TrendAnalysisParams};
use core_types::{Candle, Side, Signal, StrategyId};
use events::LogSink;
use patterns::extrema::find_troughs;
use patterns::geometry::mean;

use crate::error::StrategyError;
use crate::indicators::{closes, rsi, volumes};
use crate::levels::fixed_stops;
use crate::trend_analysis::classify_trend;
use crate::Strategy;

const SOURCE: &str = "strategy.double_bottom_rsi";

/// Neighbourhood used to locate the two bottoms.
const TROUGH_ORDER: usize = 2;
/// Applied when the breakout bar trades on ordinary volume.
const WEAK_BREAKOUT_PENALTY: f64 = 0.7;

/// Double bottom whose second low is confirmed by a higher RSI, entered on
/// the close through the neckline.
///
/// Uses wider stops and a larger target when the broader trend is bearish.
pub struct DoubleBottomRsi {
    params: DoubleBottomRsiParams,
    trend: TrendAnalysisParams,
    log: Arc<dyn LogSink>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Setup {
    first: usize,
    second: usize,
    neckline: f64,
    strength: f64,
}

impl DoubleBottomRsi {
    pub fn new(
        params: DoubleBottomRsiParams,
        trend: TrendAnalysisParams,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, StrategyError> {
        params
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        trend
            .validate()
            .map_err(|e| StrategyError::InvalidParameters(e.to_string()))?;
        Ok(Self { params, trend, log })
    }

    fn setup(&self, window: &[Candle]) -> Result<Option<Setup>, StrategyError> {
        let p = &self.params;
        if window.len() <= p.rsi_period + 1 || window.len() < 2 * TROUGH_ORDER + 2 {
            return Ok(None);
        }
        let end = window.len() - 1;
        let closes = closes(window);
        let volumes = volumes(window);

        // The breakout bar itself is never one of the bottoms.
        let start = end.saturating_sub(p.pattern_lookback);
        let troughs = find_troughs(&closes[start..end], TROUGH_ORDER, 0.0);
        let [.., a, b] = troughs.as_slice() else {
            return Ok(None);
        };
        let (first, second) = (start + a.index, start + b.index);
        let (p1, p2) = (a.price, b.price);

        if second - first < p.min_separation || p1 <= 0.0 {
            return Ok(None);
        }
        if (p2 - p1).abs() / p1 > p.price_tolerance || p2 > p1 {
            return Ok(None);
        }

        let rsi = rsi(&closes, p.rsi_period)?;
        let (r1, r2) = (rsi[first], rsi[second]);
        let in_band = |r: f64| p.rsi_floor <= r && r <= p.rsi_ceiling;
        if !(in_band(r1) && in_band(r2)) || r2 <= r1 {
            return Ok(None);
        }

        let (v1, v2) = (volumes[first], volumes[second]);
        if v1 <= 0.0 || v2 < v1 * p.volume_ratio {
            return Ok(None);
        }

        let neckline = window[first..=second]
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        if !(closes[end] > neckline && closes[end - 1] <= neckline) {
            return Ok(None);
        }

        let mut strength = ((r2 - r1) / 10.0 * (v2 / v1) / 2.0).min(1.0);
        let recent = (p.pattern_lookback / 3).max(1);
        let average_volume = mean(&volumes[end.saturating_sub(recent)..end]).unwrap_or(0.0);
        if volumes[end] < p.breakout_volume_ratio * average_volume {
            strength *= WEAK_BREAKOUT_PENALTY;
        }

        Ok(Some(Setup {
            first,
            second,
            neckline,
            strength,
        }))
    }

    fn stops(&self, entry: f64, downtrend: bool) -> (f64, f64) {
        let (normal_rr, downtrend_rr) = self.params.effective_risk_reward();
        if downtrend {
            fixed_stops(Side::Long, entry, self.params.downtrend_stop_loss_pct, downtrend_rr)
        } else {
            fixed_stops(Side::Long, entry, self.params.stop_loss_pct, normal_rr)
        }
    }
}

impl Strategy for DoubleBottomRsi {
    fn id(&self) -> StrategyId {
        StrategyId::DoubleBottomRsi
    }

    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
        let (Some(current), Some(setup)) = (window.last(), self.setup(window)?) else {
            return Ok(Vec::new());
        };
        if setup.strength < self.params.threshold {
            return Ok(Vec::new());
        }

        let downtrend = classify_trend(window, &self.trend)?
            .is_some_and(|reading| reading.trend.is_bearish());
        let (stop, target) = self.stops(current.close, downtrend);

        self.log.info(
            SOURCE,
            &format!(
                "Neckline {:.2} broken after bottoms at bars {} and {} (strength {:.2}, downtrend {downtrend})",
                setup.neckline, setup.first, setup.second, setup.strength
            ),
        );
        Ok(vec![
            Signal::new(current.timestamp, Side::Long, current.close, setup.strength)
                .with_pattern("double_bottom_rsi")
                .with_stops(stop, target),
        ])
    }
}
