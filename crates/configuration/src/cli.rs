use clap::Args;
use rust_decimal::Decimal;

use crate::settings::Config;

/// Command-line overrides for the `[risk_management]` and `[backtest]` sections.
#[derive(Debug, Clone, Default, Args)]
pub struct RiskOverrides {
    /// Fraction of equity a single position may commit.
    #[arg(long)]
    pub risk_per_trade: Option<Decimal>,

    /// Maximum number of simultaneously open positions.
    #[arg(long)]
    pub max_positions: Option<usize>,

    /// Equity floor below which new signals are rejected.
    #[arg(long)]
    pub min_equity: Option<Decimal>,

    /// Minimum signal confidence accepted by the risk manager.
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Starting cash balance.
    #[arg(long)]
    pub initial_balance: Option<Decimal>,
}

impl RiskOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(value) = self.risk_per_trade {
            config.risk_management.risk_per_trade_pct = value;
        }
        if let Some(value) = self.max_positions {
            config.risk_management.max_positions = value;
        }
        if let Some(value) = self.min_equity {
            config.risk_management.min_equity = value;
        }
        if let Some(value) = self.min_confidence {
            config.risk_management.min_confidence = value;
        }
        if let Some(value) = self.initial_balance {
            config.backtest.initial_balance = value;
        }
    }
}
