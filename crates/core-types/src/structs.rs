use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::Side;

/// One OHLCV observation for a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A trading signal produced by a strategy for the current bar only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: f64,
    /// Certainty in [0, 1].
    pub confidence: f64,
    pub pattern: Option<String>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Signal {
    pub fn new(timestamp: DateTime<Utc>, side: Side, price: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            side,
            price,
            confidence: confidence.clamp(0.0, 1.0),
            pattern: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn with_pattern(mut self, label: impl Into<String>) -> Self {
        self.pattern = Some(label.into());
        self
    }

    pub fn with_stops(mut self, stop_loss: f64, take_profit: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self.take_profit = Some(take_profit);
        self
    }
}

/// A sized request to open a position, built by the engine after risk checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub time: DateTime<Utc>,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub confidence: f64,
    pub pattern: Option<String>,
}

impl Order {
    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }
}

/// An open position owned by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub unrealized_pnl: Decimal,
    pub pattern: Option<String>,
}

impl Position {
    /// Profit or loss of the whole position if it were closed at `price`.
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::Long => (price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - price) * self.size,
        }
    }

    /// Capital committed at entry.
    pub fn notional(&self) -> Decimal {
        self.entry_price * self.size
    }

    /// True when `price` has touched either the stop-loss or the take-profit level.
    pub fn stops_hit(&self, price: Decimal) -> bool {
        match self.side {
            Side::Long => price <= self.stop_loss || price >= self.take_profit,
            Side::Short => price >= self.stop_loss || price <= self.take_profit,
        }
    }
}

/// Immutable record of a closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub position_id: Uuid,
    pub side: Side,
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    /// Return on the committed notional, in percent.
    pub return_pct: Decimal,
    pub pattern: Option<String>,
}

impl Trade {
    pub fn from_position(position: &Position, exit_price: Decimal, exit_time: DateTime<Utc>) -> Self {
        let pnl = position.pnl_at(exit_price);
        let notional = position.notional();
        let return_pct = if notional.is_zero() {
            Decimal::ZERO
        } else {
            pnl / notional * Decimal::ONE_HUNDRED
        };

        Self {
            trade_id: Uuid::new_v4(),
            position_id: position.position_id,
            side: position.side,
            size: position.size,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time,
            exit_price,
            pnl,
            return_pct,
            pattern: position.pattern.clone(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn holding_period(&self) -> Duration {
        self.exit_time - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn position(side: Side) -> Position {
        Position {
            position_id: Uuid::new_v4(),
            side,
            size: dec!(2),
            entry_price: dec!(100),
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            stop_loss: if side == Side::Long { dec!(95) } else { dec!(105) },
            take_profit: if side == Side::Long { dec!(110) } else { dec!(90) },
            unrealized_pnl: Decimal::ZERO,
            pattern: Some("double_bottom".to_string()),
        }
    }

    #[test]
    fn pnl_is_side_aware() {
        assert_eq!(position(Side::Long).pnl_at(dec!(104)), dec!(8));
        assert_eq!(position(Side::Short).pnl_at(dec!(104)), dec!(-8));
    }

    #[test]
    fn stops_trigger_on_either_level() {
        let long = position(Side::Long);
        assert!(long.stops_hit(dec!(94)));
        assert!(long.stops_hit(dec!(110)));
        assert!(!long.stops_hit(dec!(101)));

        let short = position(Side::Short);
        assert!(short.stops_hit(dec!(106)));
        assert!(short.stops_hit(dec!(89)));
        assert!(!short.stops_hit(dec!(99)));
    }

    #[test]
    fn trade_projection_carries_return() {
        let pos = position(Side::Long);
        let exit = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let trade = Trade::from_position(&pos, dec!(110), exit);

        assert_eq!(trade.pnl, dec!(20));
        assert_eq!(trade.return_pct, dec!(10));
        assert_eq!(trade.holding_period(), Duration::days(2));
        assert!(trade.is_win());
        assert_eq!(trade.pattern.as_deref(), Some("double_bottom"));
    }

    #[test]
    fn trade_list_survives_json_round_trip() {
        let exit = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let trades = vec![
            Trade::from_position(&position(Side::Long), dec!(107.5), exit),
            Trade::from_position(&position(Side::Short), dec!(103.25), exit),
        ];

        let json = serde_json::to_string(&trades).unwrap();
        let decoded: Vec<Trade> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, trades);
    }
}
