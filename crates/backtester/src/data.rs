use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use core_types::{Candle, DataError, Series};

/// Where the engine gets its candles from.
///
/// Implementations return a validated, chronologically sorted series for the
/// inclusive `[start, end]` range. An empty series means "no data", not an error.
pub trait DataSource {
    fn get_data(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Series, DataError>;
}

fn in_range(candles: Vec<Candle>, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| c.timestamp >= start && c.timestamp <= end)
        .collect()
}

/// Reads `<dir>/<SYMBOL>_<timeframe>.json`, a JSON array of candles.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", symbol.to_uppercase(), timeframe))
    }

    /// Reads every candle in `path` without validating them.
    pub fn read_candles(path: &Path) -> Result<Vec<Candle>, DataError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DataError::Source(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| DataError::Source(format!("{}: {e}", path.display())))
    }
}

impl DataSource for JsonFileSource {
    fn get_data(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Series, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "No market data file");
            return Ok(Series::default());
        }
        let candles = Self::read_candles(&path)?;
        tracing::debug!(%symbol, %timeframe, count = candles.len(), "Loaded candles");
        Series::new(in_range(candles, start, end))
    }
}

/// Serves a fixed candle list regardless of symbol or timeframe.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    candles: Vec<Candle>,
}

impl InMemorySource {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }
}

impl DataSource for InMemorySource {
    fn get_data(
        &self,
        _symbol: &str,
        _timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Series, DataError> {
        Series::new(in_range(self.candles.clone(), start, end))
    }
}
