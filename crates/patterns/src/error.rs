use thiserror::Error;

/// Errors raised while building detectors or scanning.
///
/// "No pattern found" is never an error; detectors return nothing instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("Invalid pattern parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid scan request: {0}")]
    InvalidScan(String),
}
