use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid input for performance calculation: {0}")]
    InvalidInput(String),
}
