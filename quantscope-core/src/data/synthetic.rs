//! Synthetic bars for development and demos.
//!
//! A seeded geometric random walk per symbol. Results computed on synthetic
//! data are tagged by the provider's `DataSource::Synthetic`.

use chrono::{DateTime, Datelike, Utc, Weekday};
use rand::Rng;
use tracing::warn;

use super::provider::{DataError, DataProvider, DataSource};
use crate::domain::{Bar, Interval, PriceSeries};
use crate::rng::{standard_normal, RngHierarchy};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    rng: RngHierarchy,
    start_price: f64,
    /// Per-bar return standard deviation.
    volatility: f64,
    /// Quoted spread in basis points; `None` leaves bid/ask empty.
    spread_bps: Option<f64>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngHierarchy::new(seed),
            start_price: 100.0,
            volatility: 0.015,
            spread_bps: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_quotes(mut self, spread_bps: f64) -> Self {
        self.spread_bps = Some(spread_bps);
        self
    }

    /// Generate bars for `symbol` over `[start, end]`.
    ///
    /// Daily and weekly series skip weekends.
    pub fn generate(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Vec<Bar> {
        let mut rng = self.rng.rng_for(symbol, "synthetic", 0);
        let step = interval.duration();
        let skip_weekends = matches!(interval, Interval::Day1 | Interval::Week1);

        let mut bars = Vec::new();
        let mut price = self.start_price;
        let mut current = start;

        while current <= end {
            let weekday = current.weekday();
            if skip_weekends && (weekday == Weekday::Sat || weekday == Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let ret = self.volatility * standard_normal(&mut rng);
            let open = price;
            let close = price * ret.exp();
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..self.volatility / 2.0 + 1e-9));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..self.volatility / 2.0 + 1e-9));
            let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

            let mut bar = Bar::new(current, open, high, low, close, volume);
            if let Some(bps) = self.spread_bps {
                let half = close * bps / 20_000.0;
                bar = bar.with_quote(close - half, close + half);
            }
            bars.push(bar);

            price = close;
            current += step;
        }
        bars
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(42)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn get_price_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        warn!(symbol, "generating synthetic data; results are not market data");
        let bars = self.generate(symbol, start, end, interval);
        if bars.is_empty() {
            return Err(DataError::EmptyRange {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        PriceSeries::new(symbol, interval, bars).map_err(|e| DataError::Validation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn same_seed_same_bars() {
        let (start, end) = range();
        let a = SyntheticProvider::new(7).generate("SPY", start, end, Interval::Day1);
        let b = SyntheticProvider::new(7).generate("SPY", start, end, Interval::Day1);
        assert_eq!(a, b);
    }

    #[test]
    fn symbols_get_independent_walks() {
        let (start, end) = range();
        let p = SyntheticProvider::new(7);
        let a = p.generate("SPY", start, end, Interval::Day1);
        let b = p.generate("QQQ", start, end, Interval::Day1);
        assert_ne!(a[10].close, b[10].close);
    }

    #[test]
    fn daily_bars_skip_weekends_and_are_sane() {
        let (start, end) = range();
        let bars = SyntheticProvider::default().generate("SPY", start, end, Interval::Day1);
        assert!(!bars.is_empty());
        for b in &bars {
            assert!(!matches!(b.timestamp.weekday(), Weekday::Sat | Weekday::Sun));
            assert!(b.is_sane(), "{b:?}");
        }
    }

    #[test]
    fn quotes_bracket_close() {
        let (start, end) = range();
        let bars = SyntheticProvider::default()
            .with_quotes(10.0)
            .generate("SPY", start, end, Interval::Day1);
        for b in &bars {
            assert!(b.bid.unwrap() < b.close && b.close < b.ask.unwrap());
        }
    }

    #[test]
    fn inverted_range_is_empty_range_error() {
        let (start, end) = range();
        let err = SyntheticProvider::default()
            .get_price_series("SPY", end, start, Interval::Day1)
            .unwrap_err();
        assert!(matches!(err, DataError::EmptyRange { .. }));
    }
}
