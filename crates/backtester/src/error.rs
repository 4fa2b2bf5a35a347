use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    /// A bar could not be processed. The run is aborted; trades closed before
    /// this bar remain available from the engine.
    #[error("Backtest failed at bar {index} ({timestamp})")]
    BarFailed {
        index: usize,
        timestamp: DateTime<Utc>,
        #[source]
        source: Box<BacktestError>,
    },

    #[error("Market data error: {0}")]
    Data(#[from] core_types::DataError),

    #[error("Numeric conversion error: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Strategy execution error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Execution simulation error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
