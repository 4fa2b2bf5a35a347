use crate::error::DataError;
use crate::structs::Candle;

/// A validated, chronologically ordered sequence of candles.
///
/// Construction is the only validation point: once a `Series` exists every
/// candle is finite, positive, internally consistent and strictly increasing
/// in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    pub fn new(candles: Vec<Candle>) -> Result<Self, DataError> {
        for (index, candle) in candles.iter().enumerate() {
            validate_candle(index, candle)?;
        }

        for (index, pair) in candles.windows(2).enumerate() {
            let (previous, current) = (pair[0].timestamp, pair[1].timestamp);
            if current == previous {
                return Err(DataError::DuplicateTimestamp {
                    index: index + 1,
                    timestamp: current,
                });
            }
            if current < previous {
                return Err(DataError::NonChronological {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }

        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The causal view at bar `index`: every candle up to and including it.
    pub fn window(&self, index: usize) -> &[Candle] {
        let end = (index + 1).min(self.candles.len());
        &self.candles[..end]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn into_inner(self) -> Vec<Candle> {
        self.candles
    }
}

fn validate_candle(index: usize, candle: &Candle) -> Result<(), DataError> {
    let prices = [
        ("open", candle.open),
        ("high", candle.high),
        ("low", candle.low),
        ("close", candle.close),
    ];

    for (field, value) in prices {
        if !value.is_finite() {
            return Err(DataError::NonFinite { index, field });
        }
        if value <= 0.0 {
            return Err(DataError::NonPositivePrice {
                index,
                field,
                value,
            });
        }
    }

    if !candle.volume.is_finite() {
        return Err(DataError::NonFinite {
            index,
            field: "volume",
        });
    }
    if candle.volume < 0.0 {
        return Err(DataError::NegativeVolume {
            index,
            value: candle.volume,
        });
    }

    if candle.high < candle.low {
        return Err(DataError::InconsistentRange {
            index,
            timestamp: candle.timestamp,
            reason: format!("high {} is below low {}", candle.high, candle.low),
        });
    }
    if candle.high < candle.open.max(candle.close) {
        return Err(DataError::InconsistentRange {
            index,
            timestamp: candle.timestamp,
            reason: format!("high {} is below the candle body", candle.high),
        });
    }
    if candle.low > candle.open.min(candle.close) {
        return Err(DataError::InconsistentRange {
            index,
            timestamp: candle.timestamp,
            reason: format!("low {} is above the candle body", candle.low),
        });
    }

    Ok(())
}
