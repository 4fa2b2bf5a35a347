use core_types::CoreError;
use patterns::PatternError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Strategy received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("An error occurred during indicator calculation: {0}")]
    IndicatorError(String),

    #[error("Bar index {index} is outside a window of {len} bars")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
