//! # Chartist Analytics Engine
//!
//! This crate provides the tools for conducting quantitative analysis of trading strategy
//! performance. It acts as the "unbiased judge" of the system.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** This crate has no knowledge of external systems. It depends
//!   on `core-types` for `Trade` and on `configuration` for the Sharpe settings.
//! - **Stateless Calculation:** The `AnalyticsEngine` is a stateless calculator. It takes
//!   raw trading data as input and produces a `PerformanceReport` as output.
//! - **Defined degenerate cases:** No trades yields a zeroed report, no losing trades
//!   yields an infinite profit factor. Neither is an error.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The main struct that contains the calculation logic.
//! - `PerformanceReport`: The standardized struct that holds every performance metric.
//! - `ProfitFactor`: A finite ratio or infinity.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::{PerformanceReport, ProfitFactor};
