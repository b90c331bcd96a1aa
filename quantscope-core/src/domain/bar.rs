//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single asset at a single timestamp.
///
/// `bid`/`ask` are only present when the upstream source carries quotes; the
/// anomaly feature set includes a spread column only when every bar has both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            bid: None,
            ask: None,
        }
    }

    pub fn with_quote(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Relative quoted spread `(ask - bid) / mid`, if both sides are quoted.
    pub fn relative_spread(&self) -> Option<f64> {
        let (bid, ask) = (self.bid?, self.ask?);
        let mid = (bid + ask) / 2.0;
        if mid <= 0.0 || bid.is_nan() || ask.is_nan() {
            return None;
        }
        Some((ask - bid) / mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn spread_requires_both_quotes() {
        let bar = sample_bar();
        assert!(bar.relative_spread().is_none());
        let quoted = bar.with_quote(99.0, 101.0);
        let spread = quoted.relative_spread().unwrap();
        assert!((spread - 0.02).abs() < 1e-12);
    }

    #[test]
    fn quotes_are_optional_in_json() {
        let json = r#"{"timestamp":"2024-01-02T00:00:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let bar: Bar = serde_json::from_str(json).unwrap();
        assert!(bar.bid.is_none());
        assert_eq!(bar.close, 1.5);
        let back = serde_json::to_string(&bar).unwrap();
        assert!(!back.contains("bid"));
    }
}
