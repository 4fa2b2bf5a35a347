use chrono::{DateTime, Utc};
use core_types::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Enum representing the severity of a log message for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A structured log message captured by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
}

/// A snapshot of the account handed to the risk manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub timestamp: DateTime<Utc>,
    pub balance: Decimal,
    pub equity: Decimal,
    pub positions: Vec<Position>,
}

impl PortfolioState {
    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }
}

/// Emitted at most once per bar while a backtest runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion in percent, 0 to 100.
    pub percent: f64,
    /// Timestamp of the bar just processed.
    pub timestamp: DateTime<Utc>,
    pub bar_index: usize,
    pub total_bars: usize,
    pub equity: Decimal,
    pub trades: usize,
    pub open_positions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn progress_update_serializes_context() {
        let update = ProgressUpdate {
            percent: 50.0,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            bar_index: 49,
            total_bars: 100,
            equity: dec!(10250.5),
            trades: 3,
            open_positions: 1,
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["percent"], 50.0);
        assert_eq!(json["trades"], 3);
        assert_eq!(json["equity"], "10250.5");
    }
}
