//! Thin adapters over the `ta` crate that turn a candle window into whole
//! indicator series, plus the few rolling statistics `ta` does not provide.
//!
//! Every series has the same length as its input and element `i` depends only
//! on inputs `0..=i`.

use core_types::Candle;
use patterns::geometry::{index_slope, mean};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    OnBalanceVolume, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::{DataItem, Next};

use crate::error::StrategyError;

fn init_error(name: &str, e: impl std::fmt::Debug) -> StrategyError {
    StrategyError::InvalidParameters(format!("Failed to initialize {name}: {e:?}"))
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>, StrategyError> {
    let mut ema = ExponentialMovingAverage::new(period).map_err(|e| init_error("EMA", e))?;
    Ok(values.iter().map(|&v| ema.next(v)).collect())
}

pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>, StrategyError> {
    let mut sma = SimpleMovingAverage::new(period).map_err(|e| init_error("SMA", e))?;
    Ok(values.iter().map(|&v| sma.next(v)).collect())
}

pub fn rsi(values: &[f64], period: usize) -> Result<Vec<f64>, StrategyError> {
    let mut rsi = RelativeStrengthIndex::new(period).map_err(|e| init_error("RSI", e))?;
    Ok(values.iter().map(|&v| rsi.next(v)).collect())
}

#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdSeries, StrategyError> {
    let mut indicator =
        MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(|e| init_error("MACD", e))?;

    let mut series = MacdSeries {
        macd: Vec::with_capacity(values.len()),
        signal: Vec::with_capacity(values.len()),
        histogram: Vec::with_capacity(values.len()),
    };
    for &value in values {
        let out = indicator.next(value);
        series.macd.push(out.macd);
        series.signal.push(out.signal);
        series.histogram.push(out.histogram);
    }
    Ok(series)
}

#[derive(Debug, Clone, Default)]
pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger(values: &[f64], period: usize, std_dev: f64) -> Result<Bands, StrategyError> {
    let mut bb = BollingerBands::new(period, std_dev).map_err(|e| init_error("Bollinger Bands", e))?;

    let mut bands = Bands {
        upper: Vec::with_capacity(values.len()),
        middle: Vec::with_capacity(values.len()),
        lower: Vec::with_capacity(values.len()),
    };
    for &value in values {
        let out = bb.next(value);
        bands.upper.push(out.upper);
        bands.middle.push(out.average);
        bands.lower.push(out.lower);
    }
    Ok(bands)
}

fn data_item(candle: &Candle) -> Result<DataItem, StrategyError> {
    DataItem::builder()
        .open(candle.open)
        .high(candle.high)
        .low(candle.low)
        .close(candle.close)
        .volume(candle.volume)
        .build()
        .map_err(|e| {
            StrategyError::IndicatorError(format!("invalid candle at {}: {e:?}", candle.timestamp))
        })
}

pub fn atr(candles: &[Candle], period: usize) -> Result<Vec<f64>, StrategyError> {
    let mut atr = AverageTrueRange::new(period).map_err(|e| init_error("ATR", e))?;
    candles
        .iter()
        .map(|candle| Ok(atr.next(&data_item(candle)?)))
        .collect()
}

pub fn obv(candles: &[Candle]) -> Result<Vec<f64>, StrategyError> {
    let mut obv = OnBalanceVolume::new();
    candles
        .iter()
        .map(|candle| Ok(obv.next(&data_item(candle)?)))
        .collect()
}

/// Least-squares slope of `values[end + 1 - period..=end]` per bar.
pub fn slope_at(values: &[f64], end: usize, period: usize) -> Option<f64> {
    if period < 2 || end >= values.len() || end + 1 < period {
        return None;
    }
    index_slope(&values[end + 1 - period..=end])
}

/// Slope over the last `period` values.
pub fn last_slope(values: &[f64], period: usize) -> Option<f64> {
    values
        .len()
        .checked_sub(1)
        .and_then(|end| slope_at(values, end, period))
}

/// Linearly interpolated quantile of the finite values, `q` in `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Quantile of the `window` values ending at `end`; `None` until the window is full.
pub fn rolling_quantile_at(values: &[f64], end: usize, window: usize, q: f64) -> Option<f64> {
    if window == 0 || end >= values.len() || end + 1 < window {
        return None;
    }
    quantile(&values[end + 1 - window..=end], q)
}

/// Replaces non-finite values with the last finite one. Leading gaps take the
/// first finite value.
pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let first = values.iter().copied().find(|v| v.is_finite()).unwrap_or(0.0);
    let mut last = first;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last = v;
            }
            last
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let average = mean(values)?;
    let variance =
        values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// The trailing `count` values (all of them if shorter).
pub fn tail(values: &[f64], count: usize) -> &[f64] {
    &values[values.len().saturating_sub(count)..]
}
