//! # Chartist Strategy Library
//!
//! This crate contains the trading logic of the workspace. It defines a
//! universal `Strategy` trait and provides the concrete implementations.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** No I/O and no execution. A strategy depends on
//!   `core-types`, `configuration`, `patterns` and the injected `LogSink`.
//! - **Causal windows:** Every method receives the candles up to and including
//!   the bar being decided, never more. Indicators are recomputed from that
//!   window, so there is no hidden state that could leak the future.
//! - **Strategy agnostic engine:** The backtester drives any `Box<dyn Strategy>`
//!   without knowing its internals.
//! - **Extensibility:** Adding a strategy means a new module, a `StrategyId`
//!   variant and one arm in the `factory`. The compiler flags the missing arm.
//!
//! ## Public API
//!
//! - `Strategy`: The core trait all strategies implement.
//! - `create_strategy`: The factory function to construct a strategy instance.
//! - `indicators`: Adapters over the `ta` crate.
//! - The concrete strategy structs themselves (e.g., `EmaTrend`).

pub mod double_bottom_rsi;
pub mod ema_trend;
pub mod error;
pub mod factory;
pub mod indicators;
pub mod levels;
pub mod macd;
pub mod obv;
pub mod pattern_strategy;
pub mod rsi;
pub mod trend_analysis;
pub mod volatility;

#[cfg(test)]
mod test_support;

pub use double_bottom_rsi::DoubleBottomRsi;
pub use ema_trend::EmaTrend;
pub use error::StrategyError;
pub use factory::create_strategy;
pub use macd::MacdStrategy;
pub use obv::ObvStrategy;
pub use pattern_strategy::PatternStrategy;
pub use rsi::RsiStrategy;
pub use trend_analysis::{Trend, TrendAnalysis, TrendReading, classify_trend};
pub use volatility::VolatilityStrategy;

pub use core_types::StrategyId;

use core_types::{Candle, Position, Signal};
use patterns::PatternInstance;

use crate::levels::{history, size_fraction, stops_hit};

/// Everything a strategy produced for one bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub signals: Vec<Signal>,
    /// Chart patterns the decision was based on, if any.
    pub patterns: Vec<PatternInstance>,
}

/// The core trait that all trading strategies must implement.
///
/// `window` is always the full history up to and including the current bar;
/// the current bar is `window.last()`. Methods take `&self`: a strategy derives
/// everything it needs from the window it is handed.
pub trait Strategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Signals for the last bar of `window` together with the patterns behind them.
    fn analyze(&self, window: &[Candle]) -> Result<Analysis, StrategyError> {
        Ok(Analysis {
            signals: self.generate_signals(window)?,
            patterns: Vec::new(),
        })
    }

    /// Signals for the last bar of `window`. Every returned signal has a
    /// confidence at or above the strategy's configured threshold.
    fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError>;

    /// Whether `position` should be closed at bar `current_index` of `window`.
    ///
    /// Only `window[..=current_index]` is consulted. The default exits when the
    /// bar closed through the position's stop-loss or take-profit.
    fn should_exit(
        &self,
        window: &[Candle],
        current_index: usize,
        position: &Position,
    ) -> Result<bool, StrategyError> {
        match history(window, current_index)?.last() {
            Some(bar) => stops_hit(position, bar),
            None => Ok(false),
        }
    }

    /// Fraction of equity, in `(0, 1]`, the strategy wants to commit to `signal`.
    fn calculate_position_size(&self, _window: &[Candle], signal: &Signal) -> f64 {
        size_fraction(signal.confidence)
    }
}
