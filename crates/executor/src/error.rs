use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Insufficient margin to open position. Required: {required}, Available: {available}")]
    InsufficientMargin { required: Decimal, available: Decimal },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Position not found: {0}")]
    PositionNotFound(Uuid),
}
