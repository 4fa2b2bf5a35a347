//! # Chartist Events
//!
//! The capabilities and payloads that components use to talk to the outside
//! world while a backtest runs: structured log messages, account snapshots and
//! progress updates.
//!
//! As a Layer 0 crate, it depends only on `core-types`. Components never reach
//! for a global logger or progress bar; they receive an `Arc<dyn LogSink>` and
//! an `Arc<dyn ProgressReporter>` at construction.

// Declare the modules that make up this crate.
pub mod messages;
pub mod sinks;

// Re-export the core types to provide a clean public API.
pub use messages::{LogLevel, LogMessage, PortfolioState, ProgressUpdate};
pub use sinks::{
    CallbackReporter, LogSink, MemorySink, NoopReporter, ProgressReporter, TracingSink,
};
