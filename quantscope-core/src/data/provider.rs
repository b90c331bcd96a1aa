//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (CSV directories,
//! in-memory fixtures, synthetic walks) so the engine never knows where bars
//! come from and tests can substitute fixtures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Interval, PriceSeries};
use crate::error::AnalyticsError;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    EmptyRange {
        symbol: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("'{symbol}' is not available at interval {requested} (have {available})")]
    IntervalUnavailable {
        symbol: String,
        requested: Interval,
        available: Interval,
    },

    #[error("parse error in {source_name} row {row}: {detail}")]
    Parse {
        source_name: String,
        row: usize,
        detail: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl DataError {
    pub fn symbol_not_found(symbol: &str) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.to_string(),
        }
    }

    /// Every provider failure leaves nothing to analyze for that symbol,
    /// so all of them surface as the terminal `DataUnavailable`.
    pub fn into_analytics(self, symbol: &str) -> AnalyticsError {
        AnalyticsError::unavailable(symbol, self.to_string())
    }
}

impl From<DataError> for AnalyticsError {
    fn from(e: DataError) -> Self {
        let symbol = match &e {
            DataError::SymbolNotFound { symbol }
            | DataError::EmptyRange { symbol, .. }
            | DataError::IntervalUnavailable { symbol, .. } => symbol.clone(),
            _ => String::new(),
        };
        e.into_analytics(&symbol)
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    InMemory,
    Csv,
    Synthetic,
}

/// Trait for data providers.
///
/// Implementations return a validated `PriceSeries` restricted to
/// `[start, end]`. An empty range is an error, never an empty series.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    fn get_price_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<PriceSeries, DataError>;
}

/// Restrict a series to `[start, end]`, failing on an empty result.
pub(crate) fn slice_range(
    series: &PriceSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<PriceSeries, DataError> {
    let bars: Vec<_> = series
        .bars()
        .iter()
        .filter(|b| b.timestamp >= start && b.timestamp <= end)
        .cloned()
        .collect();
    if bars.is_empty() {
        return Err(DataError::EmptyRange {
            symbol: series.symbol().to_string(),
            start,
            end,
        });
    }
    PriceSeries::new(series.symbol(), series.interval(), bars)
        .map_err(|e| DataError::Validation(e.to_string()))
}
