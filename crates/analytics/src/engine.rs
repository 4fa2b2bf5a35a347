use std::time::Duration;

use chrono::{DateTime, Utc};
use configuration::SharpeBasis;
use core_types::{Trade, to_f64};
use rust_decimal::Decimal;

use crate::error::AnalyticsError;
use crate::report::{PerformanceReport, ProfitFactor};

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    annualization_factor: f64,
    sharpe_basis: SharpeBasis,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(252.0, SharpeBasis::PerTrade)
    }
}

impl AnalyticsEngine {
    /// `annualization_factor` is the number of return observations per year;
    /// the raw Sharpe ratio is scaled by its square root.
    pub fn new(annualization_factor: f64, sharpe_basis: SharpeBasis) -> Self {
        Self {
            annualization_factor,
            sharpe_basis,
        }
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - Every closed `Trade` of the run, in closing order.
    /// * `equity_curve` - Per-bar `(timestamp, equity)` points.
    /// * `initial_capital` - The starting balance of the run.
    ///
    /// # Returns
    ///
    /// A zeroed report when `trades` is empty, otherwise the full report.
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::InvalidInput(format!(
                "initial capital must be positive, got {initial_capital}"
            )));
        }

        let mut report = PerformanceReport::default();
        if trades.is_empty() {
            return Ok(report);
        }

        self.calculate_profitability(trades, initial_capital, &mut report);
        self.calculate_streaks(trades, &mut report);
        self.calculate_drawdown(equity_curve, initial_capital, &mut report);
        self.calculate_time_metrics(trades, &mut report);
        self.calculate_ratios(trades, equity_curve, &mut report);

        tracing::debug!(
            trades = report.total_trades,
            net_profit = %report.total_net_profit,
            sharpe = report.sharpe_ratio,
            "Performance report calculated"
        );
        Ok(report)
    }

    /// Calculates all profitability-related metrics.
    fn calculate_profitability(
        &self,
        trades: &[Trade],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        report.total_trades = trades.len();

        for trade in trades {
            report.total_net_profit += trade.pnl;
            if trade.is_win() {
                report.gross_profit += trade.pnl;
                report.winning_trades += 1;
                report.largest_win = report.largest_win.max(trade.pnl);
            } else if trade.pnl < Decimal::ZERO {
                report.gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
                report.largest_loss = report.largest_loss.max(trade.pnl.abs());
            }
        }

        report.profit_factor = if report.gross_loss > Decimal::ZERO {
            ProfitFactor::Ratio(report.gross_profit / report.gross_loss)
        } else if report.gross_profit > Decimal::ZERO {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Ratio(Decimal::ZERO)
        };

        let total = Decimal::from(report.total_trades);
        report.win_rate = Decimal::from(report.winning_trades) / total;

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }
        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            report.payoff_ratio = Some(report.average_win / report.average_loss);
        }

        report.expectancy = report.win_rate * report.average_win
            - (Decimal::ONE - report.win_rate) * report.average_loss;
        report.total_return_pct = report.total_net_profit / initial_capital * Decimal::ONE_HUNDRED;
    }

    fn calculate_streaks(&self, trades: &[Trade], report: &mut PerformanceReport) {
        let (mut wins, mut losses) = (0usize, 0usize);
        for trade in trades {
            if trade.is_win() {
                wins += 1;
                losses = 0;
            } else if trade.pnl < Decimal::ZERO {
                losses += 1;
                wins = 0;
            } else {
                (wins, losses) = (0, 0);
            }
            report.max_consecutive_wins = report.max_consecutive_wins.max(wins);
            report.max_consecutive_losses = report.max_consecutive_losses.max(losses);
        }
    }

    /// Calculates maximum drawdown from the equity curve, starting at the initial capital.
    fn calculate_drawdown(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        let mut peak = initial_capital;
        for &(_timestamp, equity) in equity_curve {
            peak = peak.max(equity);
            let drawdown = peak - equity;
            if drawdown > report.max_drawdown_amount {
                report.max_drawdown_amount = drawdown;
                if peak > Decimal::ZERO {
                    report.max_drawdown = drawdown / peak;
                }
            }
        }
    }

    /// Calculates all ratio-based metrics like Sharpe and Calmar.
    fn calculate_ratios(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) {
        if report.max_drawdown > Decimal::ZERO {
            report.calmar_ratio =
                Some(report.total_return_pct / (report.max_drawdown * Decimal::ONE_HUNDRED));
        }

        let returns: Vec<f64> = match self.sharpe_basis {
            SharpeBasis::PerTrade => trades
                .iter()
                .map(|t| to_f64(t.return_pct) / 100.0)
                .collect(),
            SharpeBasis::PerPeriod => equity_curve
                .windows(2)
                .filter(|w| !w[0].1.is_zero())
                .map(|w| to_f64((w[1].1 - w[0].1) / w[0].1))
                .collect(),
        };
        report.sharpe_ratio = sharpe(&returns, self.annualization_factor);
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(&self, trades: &[Trade], report: &mut PerformanceReport) {
        let total_secs: i64 = trades
            .iter()
            .map(|t| t.holding_period().num_seconds().max(0))
            .sum();
        let average = total_secs / trades.len() as i64;
        report.average_holding_period = Duration::from_secs(average.unsigned_abs());
    }
}

/// Mean over sample standard deviation, scaled by `sqrt(annualization)`.
/// Zero when there are fewer than two returns or no dispersion.
fn sharpe(returns: &[f64], annualization: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if !(std_dev > 0.0) || !std_dev.is_finite() {
        return 0.0;
    }
    mean / std_dev * annualization.sqrt()
}
