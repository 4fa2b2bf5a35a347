//! Conversions between the `f64` market-data domain and the `Decimal` ledger domain.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::error::CoreError;

/// Converts a market price or size into a ledger decimal.
pub fn to_decimal(value: f64) -> Result<Decimal, CoreError> {
    Decimal::from_f64(value).ok_or_else(|| {
        CoreError::Calculation(format!("{value} cannot be represented as a decimal"))
    })
}

/// Converts a ledger decimal back into the floating-point domain.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
