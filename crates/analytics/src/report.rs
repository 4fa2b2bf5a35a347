use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use core_types::to_f64;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Gross profit over gross loss.
///
/// A run with winners and no losers has an infinite profit factor, which is a
/// legitimate result rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Ratio(Decimal),
    Infinite,
}

impl ProfitFactor {
    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Ratio(value) => to_f64(*value),
            ProfitFactor::Infinite => f64::INFINITY,
        }
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Ratio(Decimal::ZERO)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Ratio(value) => write!(f, "{:.2}", value),
            ProfitFactor::Infinite => f.write_str("inf"),
        }
    }
}

/// A comprehensive, standardized report of a strategy's performance.
///
/// Every field is zero for a run without closed trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Core Profitability Metrics
    pub total_net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: ProfitFactor,
    pub total_return_pct: Decimal,
    /// `win_rate * average_win - (1 - win_rate) * average_loss`.
    pub expectancy: Decimal,

    // II. Risk and Drawdown
    /// Peak-to-trough decline of the equity curve as a positive fraction.
    pub max_drawdown: Decimal,
    pub max_drawdown_amount: Decimal,
    pub sharpe_ratio: f64,
    pub calmar_ratio: Option<Decimal>, // None when there is no drawdown

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Fraction of trades with a positive pnl.
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // None when there are no losers
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // IV. Time-Based Metrics
    #[serde(with = "humantime_serde")]
    pub average_holding_period: Duration,
}

impl PerformanceReport {
    /// The flat name -> value view of the report.
    ///
    /// An infinite profit factor is reported as `f64::INFINITY`.
    pub fn as_metrics(&self) -> BTreeMap<String, f64> {
        let optional = |value: Option<Decimal>| value.map(to_f64).unwrap_or(0.0);
        [
            ("total_net_profit", to_f64(self.total_net_profit)),
            ("gross_profit", to_f64(self.gross_profit)),
            ("gross_loss", to_f64(self.gross_loss)),
            ("profit_factor", self.profit_factor.as_f64()),
            ("total_return_pct", to_f64(self.total_return_pct)),
            ("expectancy", to_f64(self.expectancy)),
            ("max_drawdown", to_f64(self.max_drawdown)),
            ("max_drawdown_amount", to_f64(self.max_drawdown_amount)),
            ("sharpe_ratio", self.sharpe_ratio),
            ("calmar_ratio", optional(self.calmar_ratio)),
            ("total_trades", self.total_trades as f64),
            ("winning_trades", self.winning_trades as f64),
            ("losing_trades", self.losing_trades as f64),
            ("win_rate", to_f64(self.win_rate)),
            ("average_win", to_f64(self.average_win)),
            ("average_loss", to_f64(self.average_loss)),
            ("payoff_ratio", optional(self.payoff_ratio)),
            ("largest_win", to_f64(self.largest_win)),
            ("largest_loss", to_f64(self.largest_loss)),
            ("max_consecutive_wins", self.max_consecutive_wins as f64),
            ("max_consecutive_losses", self.max_consecutive_losses as f64),
            (
                "average_holding_period_secs",
                self.average_holding_period.as_secs_f64(),
            ),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}
