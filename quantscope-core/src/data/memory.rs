//! In-memory provider for tests and embedding.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::provider::{slice_range, DataError, DataProvider, DataSource};
use crate::domain::{Interval, PriceSeries};

/// Holds one series per symbol. `insert` replaces, so pushing a longer
/// series simulates a new bar arriving.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: RwLock<HashMap<String, PriceSeries>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        let provider = Self::new();
        for s in series {
            provider.insert(s);
        }
        provider
    }

    pub fn insert(&self, series: PriceSeries) {
        let mut map = match self.series.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(series.symbol().to_string(), series);
    }

    pub fn symbols(&self) -> Vec<String> {
        let map = match self.series.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut symbols: Vec<String> = map.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl DataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn source(&self) -> DataSource {
        DataSource::InMemory
    }

    fn get_price_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        let map = match self.series.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let series = map
            .get(symbol)
            .ok_or_else(|| DataError::symbol_not_found(symbol))?;
        if series.interval() != interval {
            return Err(DataError::IntervalUnavailable {
                symbol: symbol.to_string(),
                requested: interval,
                available: series.interval(),
            });
        }
        slice_range(series, start, end)
    }
}
