use configuration::PatternParams;
use core_types::Candle;

use crate::extrema::{Extremum, ExtremumKind, find_extrema};
use crate::geometry::{clamp_unit, index_slope, linear_fit, mean, rolling_mean};
use crate::pattern::{PatternPoint, PointRole};

/// A lookback slice of candles with its closes, volumes and extrema precomputed.
///
/// Every detector run against the same bar shares one window, so the extrema
/// are found once. Extremum indices are local to the window; `offset` maps
/// them back to absolute series positions.
#[derive(Debug, Clone)]
pub struct PatternWindow<'a> {
    candles: &'a [Candle],
    offset: usize,
    closes: Vec<f64>,
    volumes: Vec<f64>,
    peaks: Vec<Extremum>,
    troughs: Vec<Extremum>,
    mean_close: f64,
}

impl<'a> PatternWindow<'a> {
    pub fn new(
        candles: &'a [Candle],
        offset: usize,
        order: usize,
        min_relative_change: f64,
    ) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let (peaks, troughs): (Vec<Extremum>, Vec<Extremum>) =
            find_extrema(&closes, order, min_relative_change)
                .into_iter()
                .partition(|e| e.kind == ExtremumKind::Peak);
        let mean_close = mean(&closes).unwrap_or(0.0);

        Self {
            candles,
            offset,
            closes,
            volumes,
            peaks,
            troughs,
            mean_close,
        }
    }

    pub fn from_params(candles: &'a [Candle], offset: usize, params: &PatternParams) -> Self {
        Self::new(
            candles,
            offset,
            params.extremum_order,
            params.min_relative_change,
        )
    }

    /// The trailing `lookback` candles of `history`, indexed absolutely.
    pub fn trailing(history: &'a [Candle], lookback: usize, params: &PatternParams) -> Self {
        let start = history.len().saturating_sub(lookback);
        Self::from_params(&history[start..], start, params)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn peaks(&self) -> &[Extremum] {
        &self.peaks
    }

    pub fn troughs(&self) -> &[Extremum] {
        &self.troughs
    }

    /// Peaks and troughs merged in index order.
    pub fn extrema(&self) -> Vec<Extremum> {
        let mut all: Vec<Extremum> = self.peaks.iter().chain(&self.troughs).copied().collect();
        all.sort_by_key(|e| e.index);
        all
    }

    pub fn mean_close(&self) -> f64 {
        self.mean_close
    }

    /// Builds a point for the local index `local`.
    ///
    /// Callers only pass indices taken from this window's own extrema or bounds.
    pub fn point(&self, local: usize, role: PointRole) -> PatternPoint {
        let candle = &self.candles[local];
        PatternPoint {
            index: self.offset + local,
            timestamp: candle.timestamp,
            price: candle.close,
            role,
        }
    }

    pub fn extremum_point(&self, extremum: &Extremum, role: PointRole) -> PatternPoint {
        PatternPoint {
            price: extremum.price,
            ..self.point(extremum.index, role)
        }
    }

    /// Maps an absolute point index back into this window.
    pub fn local_index(&self, point: &PatternPoint) -> Option<usize> {
        point
            .index
            .checked_sub(self.offset)
            .filter(|local| *local < self.len())
    }

    /// Slope of a line through `points`, as relative price change per window length.
    ///
    /// Prices are divided by the window's mean close and indices by the window
    /// length minus one, so the result is comparable across instruments and
    /// window sizes.
    pub fn normalized_slope(&self, points: &[PatternPoint]) -> Option<f64> {
        if self.len() < 2 || self.mean_close <= 0.0 {
            return None;
        }
        let span = (self.len() - 1) as f64;
        let mut xs = Vec::with_capacity(points.len());
        let mut ys = Vec::with_capacity(points.len());
        for point in points {
            let local = self.local_index(point)?;
            xs.push(local as f64 / span);
            ys.push(point.price / self.mean_close);
        }
        linear_fit(&xs, &ys).map(|(slope, _)| slope)
    }

    /// Relative volume change across `[start, end]` implied by its linear trend, clamped to `[0, 1]`.
    pub fn volume_trend(&self, start: usize, end: usize) -> f64 {
        let Some(volumes) = self.volume_slice(start, end) else {
            return 0.0;
        };
        let (Some(slope), Some(average)) = (index_slope(volumes), mean(volumes)) else {
            return 0.0;
        };
        if average <= 0.0 {
            return 0.0;
        }
        clamp_unit(slope * (volumes.len() - 1) as f64 / average)
    }

    /// Relative change between the smoothed volume at the start and at the end
    /// of `[start, end]`, clamped to `[0, 1]`.
    pub fn volume_change(&self, start: usize, end: usize) -> f64 {
        let Some(volumes) = self.volume_slice(start, end) else {
            return 0.0;
        };
        let period = (volumes.len() / 5).max(3);
        let smoothed = rolling_mean(volumes, period);
        let edge = period.min(volumes.len() / 3).max(1);

        let start_mean = mean(&smoothed[..edge]).unwrap_or(0.0);
        let end_mean = mean(&smoothed[smoothed.len() - edge..]).unwrap_or(0.0);
        if start_mean <= 0.0 {
            return 0.0;
        }
        clamp_unit((end_mean - start_mean) / start_mean)
    }

    fn volume_slice(&self, start: usize, end: usize) -> Option<&[f64]> {
        if end <= start || end >= self.volumes.len() {
            return None;
        }
        Some(&self.volumes[start..=end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&c, &v))| {
                Candle::new(start + Duration::hours(i as i64), c, c + 0.5, c - 0.5, c, v)
            })
            .collect()
    }

    #[test]
    fn points_carry_absolute_indices() {
        let data = candles(&[100.0, 104.0, 108.0, 103.0, 99.0], &[1.0; 5]);
        let window = PatternWindow::new(&data[1..], 1, 1, 0.01);

        assert_eq!(window.peaks().len(), 1);
        let peak = window.extremum_point(&window.peaks()[0], PointRole::Peak);
        assert_eq!(peak.index, 2);
        assert_eq!(peak.price, 108.0);
        assert_eq!(window.local_index(&peak), Some(1));
    }

    #[test]
    fn trailing_window_respects_lookback() {
        let data = candles(&[100.0; 10], &[1.0; 10]);
        let window = PatternWindow::trailing(&data, 4, &PatternParams::default());
        assert_eq!(window.len(), 4);
        assert_eq!(window.offset(), 6);
    }

    #[test]
    fn normalized_slope_of_flat_line_is_zero() {
        let data = candles(&[100.0; 11], &[1.0; 11]);
        let window = PatternWindow::new(&data, 0, 2, 0.01);
        let points = [
            window.point(0, PointRole::Peak),
            window.point(5, PointRole::Peak),
            window.point(10, PointRole::Peak),
        ];
        assert_eq!(window.normalized_slope(&points), Some(0.0));
    }

    #[test]
    fn rising_volume_scores_positive() {
        let data = candles(&[100.0; 6], &[100.0, 110.0, 120.0, 130.0, 140.0, 150.0]);
        let window = PatternWindow::new(&data, 0, 2, 0.01);
        assert!(window.volume_trend(0, 5) > 0.3);
        assert!(window.volume_change(0, 5) > 0.0);
        assert_eq!(window.volume_trend(3, 3), 0.0);

        let falling = candles(&[100.0; 6], &[150.0, 140.0, 130.0, 120.0, 110.0, 100.0]);
        let window = PatternWindow::new(&falling, 0, 2, 0.01);
        assert_eq!(window.volume_trend(0, 5), 0.0);
    }
}
