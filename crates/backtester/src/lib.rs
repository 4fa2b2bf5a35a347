//! # Chartist Backtester
//!
//! The causal event loop. A `Backtester` owns the account for one run and, for
//! every bar, asks the strategy about exits and new signals, screens signals
//! through the risk manager and executes the sized orders.
//!
//! ## Public API
//!
//! - `Backtester`: The engine, driven by `step()` or drained by `run()`.
//! - `StepOutcome` / `StepResult`: What one call to `step()` produced.
//! - `DataSource`: Candle providers (`JsonFileSource`, `InMemorySource`).
//! - `IndicatifReporter`: A terminal progress bar for the engine's updates.
//! - `BacktestError`: The specific error types that can be returned from this crate.

pub mod data;
pub mod engine;
pub mod error;
pub mod progress;

pub use data::{DataSource, InMemorySource, JsonFileSource};
pub use engine::{Backtester, RunState, StepOutcome, StepResult};
pub use error::BacktestError;
pub use progress::IndicatifReporter;
