pub mod convert;
pub mod enums;
pub mod error;
pub mod series;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use convert::{to_decimal, to_f64};
pub use enums::{Direction, PatternKind, Side, StrategyId};
pub use error::{CoreError, DataError};
pub use series::Series;
pub use structs::{Candle, Order, Position, Signal, Trade};
