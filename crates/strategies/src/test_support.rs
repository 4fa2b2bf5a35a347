use chrono::{Duration, TimeZone, Utc};
use core_types::{Candle, Position, Side, to_decimal};
use uuid::Uuid;

/// Hourly candles with a 1% high/low spread around each close.
pub fn candles(closes: &[f64]) -> Vec<Candle> {
    with_volumes(closes, &vec![1_000.0; closes.len()])
}

pub fn with_volumes(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| {
            Candle::new(start + Duration::hours(i as i64), c, c * 1.005, c * 0.995, c, v)
        })
        .collect()
}

/// Piecewise-linear path through `(index, price)` anchors.
pub fn path(anchors: &[(usize, f64)]) -> Vec<f64> {
    let mut closes = Vec::new();
    for pair in anchors.windows(2) {
        let ((i0, p0), (i1, p1)) = (pair[0], pair[1]);
        for i in i0..i1 {
            let t = (i - i0) as f64 / (i1 - i0) as f64;
            closes.push(p0 + (p1 - p0) * t);
        }
    }
    if let Some(&(_, last)) = anchors.last() {
        closes.push(last);
    }
    closes
}

pub fn position(side: Side, entry: f64, stop_loss: f64, take_profit: f64) -> Position {
    Position {
        position_id: Uuid::new_v4(),
        side,
        size: to_decimal(1.0).unwrap(),
        entry_price: to_decimal(entry).unwrap(),
        entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        stop_loss: to_decimal(stop_loss).unwrap(),
        take_profit: to_decimal(take_profit).unwrap(),
        unrealized_pnl: to_decimal(0.0).unwrap(),
        pattern: None,
    }
}
