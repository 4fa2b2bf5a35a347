use configuration::RiskManagement;
use core_types::{Side, Signal};
use events::PortfolioState;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::RiskError;
use crate::RiskManager;

/// Decimal places kept when sizing; the remainder is truncated, never rounded up.
const SIZE_SCALE: u32 = 8;

/// A simple, concrete implementation of the `RiskManager` trait.
///
/// Limits the number of open positions, refuses to trade below an equity floor
/// or on low-confidence signals, and caps each position's notional at a fixed
/// fraction of equity.
#[derive(Debug, Clone)]
pub struct SimpleRiskManager {
    params: RiskManagement,
}

impl SimpleRiskManager {
    /// Creates a new `SimpleRiskManager` with the given configuration parameters.
    pub fn new(params: RiskManagement) -> Result<Self, RiskError> {
        params
            .validate()
            .map_err(|e| RiskError::InvalidParameters(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &RiskManagement {
        &self.params
    }
}

impl RiskManager for SimpleRiskManager {
    fn check_limits(&self, state: &PortfolioState, signal: &Signal) -> bool {
        if state.open_positions() >= self.params.max_positions {
            tracing::debug!(
                open = state.open_positions(),
                max = self.params.max_positions,
                "Signal rejected: position limit reached"
            );
            return false;
        }
        if state.equity < self.params.min_equity {
            tracing::debug!(
                equity = %state.equity,
                floor = %self.params.min_equity,
                "Signal rejected: equity below floor"
            );
            return false;
        }
        if signal.confidence < self.params.min_confidence {
            tracing::debug!(
                confidence = signal.confidence,
                floor = self.params.min_confidence,
                "Signal rejected: confidence below floor"
            );
            return false;
        }
        true
    }

    fn adjust_position_size(&self, size: Decimal, price: Decimal, equity: Decimal) -> Decimal {
        if size <= Decimal::ZERO || price <= Decimal::ZERO || equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let cap = equity * self.params.risk_per_trade_pct / price;
        let sized = size
            .min(cap)
            .round_dp_with_strategy(SIZE_SCALE, RoundingStrategy::ToZero);
        if sized < self.params.min_position_size {
            tracing::debug!(%sized, min = %self.params.min_position_size, "Position size below minimum");
            return Decimal::ZERO;
        }
        sized
    }

    fn default_stops(&self, side: Side, entry: Decimal) -> (Decimal, Decimal) {
        let distance = entry * self.params.stop_loss_pct;
        let reward = distance * self.params.risk_reward;
        match side {
            Side::Long => (entry - distance, entry + reward),
            Side::Short => (entry + distance, entry - reward),
        }
    }
}
