//! # Patterns Crate
//!
//! Geometric chart-pattern detection over bounded lookback windows.
//!
//! ## Architectural Principles
//!
//! - **Pure and causal**: every function works on the slice it is handed and
//!   nothing else. A window ending at bar `i` never sees bar `i + 1`.
//! - **One pass of extrema per window**: `PatternWindow` finds peaks and troughs
//!   once; every detector reads them from there.
//! - **Absence is not an error**: a detector that finds nothing returns an empty
//!   point list and a confidence of 0.0.
//! - **Tunable geometry**: every threshold lives in `configuration::PatternParams`.
//!
//! ## Public API
//!
//! - `find_extrema`: Local peak/trough detection with a prominence filter.
//! - `PatternDetector`: The per-family detector trait, with `detectors::*` implementations.
//! - `PatternOrchestrator`: Runs detectors, filters by confidence and resolves conflicts.
//! - `scan_windows`: Parallel batch scanning of independent windows.

pub mod detector;
pub mod detectors;
pub mod error;
pub mod extrema;
pub mod geometry;
pub mod orchestrator;
pub mod pattern;
pub mod scan;
pub mod window;

pub use detector::PatternDetector;
pub use detectors::create_detector;
pub use error::PatternError;
pub use extrema::{Extremum, ExtremumKind, find_extrema, find_peaks, find_troughs};
pub use orchestrator::PatternOrchestrator;
pub use pattern::{PatternInstance, PatternPoint, PointRole};
pub use scan::{WindowScan, scan_windows};
pub use window::PatternWindow;
