use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Calculation error: {0}")]
    Calculation(String),
}

/// Raised while validating a candle series, before any bar is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Candle {index}: field '{field}' is not a finite number")]
    NonFinite { index: usize, field: &'static str },

    #[error("Candle {index}: field '{field}' must be positive, got {value}")]
    NonPositivePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Candle {index}: volume must be non-negative, got {value}")]
    NegativeVolume { index: usize, value: f64 },

    #[error("Candle {index} at {timestamp}: inconsistent range ({reason})")]
    InconsistentRange {
        index: usize,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("Candle {index}: timestamp {current} is earlier than previous {previous}")]
    NonChronological {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Candle {index}: duplicate timestamp {timestamp}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("Failed to read market data: {0}")]
    Source(String),
}
