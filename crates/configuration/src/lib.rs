//! # Configuration Crate
//!
//! Typed, validated settings for every component of the workspace, plus the
//! logging bootstrap used by the binary.
//!
//! ## Architectural Principles
//!
//! - **Defaults everywhere**: every section derives its defaults, so a partial
//!   `config.toml` (or none at all) still yields a runnable configuration.
//! - **Fail at load time**: `load_config` validates the whole tree before
//!   returning, so downstream constructors only re-check their own invariants.
//! - **Layered sources**: the TOML file is overlaid by `CHARTIST__SECTION__KEY`
//!   environment variables.
//!
//! ## Public API
//!
//! - `load_config`: Reads, overlays and validates the configuration.
//! - `Config` and its sections: The strongly-typed settings tree.
//! - `telemetry::init_tracing`: Installs the global `tracing` subscriber.
//! - `RiskOverrides` (feature `clap`): Command-line overrides for risk settings.

use std::path::Path;

use crate::error::ConfigError;

// Declare the modules that make up this crate.
#[cfg(feature = "clap")]
pub mod cli;
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
#[cfg(feature = "clap")]
pub use cli::RiskOverrides;
pub use settings::{
    Backtest, Config, DoubleBottomRsiParams, EmaTrendParams, Logging, MacdParams, ObvParams,
    PatternParams, PatternStrategyParams, RiskManagement, RsiParams, SharpeBasis, Strategies,
    TrendAnalysisParams, VolatilityParams,
};

/// Loads the application configuration.
///
/// With `Some(path)` the file must exist. With `None`, `config.toml` in the
/// working directory is used when present and the defaults otherwise.
/// Environment variables prefixed with `CHARTIST__` override file values.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config.toml").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("CHARTIST")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(
        symbol = %config.backtest.symbol,
        interval = %config.backtest.interval,
        "Configuration loaded"
    );

    Ok(config)
}
