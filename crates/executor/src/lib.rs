//! # Chartist Executor Crate
//!
//! This crate owns the simulated trading account: the cash balance, the open
//! positions and the record of every closed trade.
//!
//! ## Architectural Principles
//!
//! - **Single owner:** The `Account` is the only thing that creates, mutates or
//!   destroys a `Position`, and the only writer of balance and equity.
//! - **Atomic rejection:** An order that fails validation or the margin check
//!   leaves the account exactly as it was. Rejections are values
//!   (`ExecutorError`), never silent clamps.
//! - **Exact arithmetic:** All ledger values are `Decimal`.
//!
//! ## Public API
//!
//! - `Account`: The in-memory ledger for one backtest run.
//! - `Snapshot`: One balance/equity history point.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod account;
pub mod error;

// Re-export the key components to provide a clean, public-facing API.
pub use account::{Account, Snapshot};
pub use error::ExecutorError;
