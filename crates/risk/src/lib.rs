//! # Chartist Risk Crate
//!
//! Screens signals against account-level limits and caps the size of every
//! order before it reaches the account.
//!
//! ## Public API
//!
//! - `RiskManager`: The trait the backtester consults for each signal.
//! - `SimpleRiskManager`: Fixed-fractional limits driven by `[risk_management]`.
//! - `RiskError`: The specific error types that can be returned from this crate.

pub mod error;
pub mod simple_manager;

pub use error::RiskError;
pub use simple_manager::SimpleRiskManager;

use core_types::{Side, Signal};
use events::PortfolioState;
use rust_decimal::Decimal;

/// The risk gate between a strategy's signals and the account.
pub trait RiskManager: Send + Sync {
    /// Whether a new position may be opened for `signal` given the account state.
    fn check_limits(&self, state: &PortfolioState, signal: &Signal) -> bool;

    /// Caps `size` (in units) so that its notional stays within the per-trade
    /// budget. Returns zero when the capped size is below the minimum.
    fn adjust_position_size(&self, size: Decimal, price: Decimal, equity: Decimal) -> Decimal;

    /// Stop-loss and take-profit for a signal that carries none.
    fn default_stops(&self, side: Side, entry: Decimal) -> (Decimal, Decimal);
}
