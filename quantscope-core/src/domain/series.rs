//! PriceSeries: an ordered, validated run of bars for one asset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use crate::error::AnalyticsError;
use crate::fingerprint::DataVersion;

/// Bar interval requested from a data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        match self {
            Interval::Minute1 => Duration::minutes(1),
            Interval::Minute5 => Duration::minutes(5),
            Interval::Minute15 => Duration::minutes(15),
            Interval::Hour1 => Duration::hours(1),
            Interval::Day1 => Duration::days(1),
            Interval::Week1 => Duration::weeks(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1w",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::Minute1),
            "5m" => Ok(Interval::Minute5),
            "15m" => Ok(Interval::Minute15),
            "1h" => Ok(Interval::Hour1),
            "1d" => Ok(Interval::Day1),
            "1w" => Ok(Interval::Week1),
            other => Err(AnalyticsError::invalid(
                "interval",
                format!("unknown interval '{other}'"),
            )),
        }
    }
}

/// Ordered bars for a single asset.
///
/// Invariant: timestamps are strictly increasing (no duplicates). The
/// constructor enforces it, and deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesParts")]
pub struct PriceSeries {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct SeriesParts {
    symbol: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl TryFrom<SeriesParts> for PriceSeries {
    type Error = AnalyticsError;

    fn try_from(parts: SeriesParts) -> Result<Self, Self::Error> {
        PriceSeries::new(parts.symbol, parts.interval, parts.bars)
    }
}

impl PriceSeries {
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, AnalyticsError> {
        let symbol = symbol.into();
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(AnalyticsError::invalid(
                    "bars",
                    format!(
                        "{symbol}: timestamp at index {} ({}) is not after {}",
                        i + 1,
                        pair[1].timestamp,
                        pair[0].timestamp
                    ),
                ));
            }
        }
        Ok(Self {
            symbol,
            interval,
            bars,
        })
    }

    /// Daily series from close prices, starting 2024-01-02.
    ///
    /// Open = previous close, high/low = max/min(open, close) ± 1.0,
    /// volume = 1000. Intended for fixtures and examples.
    pub fn from_closes(symbol: impl Into<String>, closes: &[f64]) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single();
        let base = base.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar::new(
                    base + Duration::days(i as i64),
                    open,
                    open.max(close) + 1.0,
                    open.min(close) - 1.0,
                    close,
                    1000.0,
                )
            })
            .collect();
        Self {
            symbol: symbol.into(),
            interval: Interval::Day1,
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Log returns of the close, length `len() - 1`.
    ///
    /// A non-positive or NaN price on either side yields a NaN return.
    pub fn log_returns(&self) -> Vec<f64> {
        log_returns(&self.closes())
    }

    /// The trailing `n` bars as a new series (the whole series if shorter).
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            interval: self.interval,
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Identity of this exact data: last timestamp plus a content fingerprint.
    pub fn version(&self) -> DataVersion {
        DataVersion::of(self)
    }
}

/// Log returns of a price slice, length `prices.len() - 1`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let bars = vec![
            Bar::new(ts(2), 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(ts(2), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        let err = PriceSeries::new("SPY", Interval::Day1, bars).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let bars = vec![
            Bar::new(ts(3), 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(ts(2), 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        assert!(PriceSeries::new("SPY", Interval::Day1, bars).is_err());
    }

    #[test]
    fn from_closes_is_strictly_increasing() {
        let s = PriceSeries::from_closes("TEST", &[1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert!(PriceSeries::new("TEST", Interval::Day1, s.bars().to_vec()).is_ok());
    }

    #[test]
    fn log_returns_length_and_values() {
        let s = PriceSeries::from_closes("TEST", &[100.0, 110.0, 99.0]);
        let r = s.log_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1_f64).ln()).abs() < 1e-12);
        assert!((r[1] - (0.9_f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn log_returns_non_positive_price_is_nan() {
        let r = log_returns(&[100.0, 0.0, 50.0]);
        assert!(r[0].is_nan());
        assert!(r[1].is_nan());
    }

    #[test]
    fn tail_keeps_last_bars() {
        let s = PriceSeries::from_closes("TEST", &[1.0, 2.0, 3.0, 4.0]);
        let t = s.tail(2);
        assert_eq!(t.closes(), vec![3.0, 4.0]);
        assert_eq!(s.tail(10).len(), 4);
    }

    #[test]
    fn deserialization_validates_order() {
        let s = PriceSeries::from_closes("TEST", &[1.0, 2.0]);
        let mut json = serde_json::to_value(&s).unwrap();
        let bars = json["bars"].as_array_mut().unwrap();
        bars.swap(0, 1);
        assert!(serde_json::from_value::<PriceSeries>(json).is_err());
    }

    #[test]
    fn interval_parse_roundtrip() {
        for iv in [Interval::Minute1, Interval::Hour1, Interval::Day1, Interval::Week1] {
            assert_eq!(iv.as_str().parse::<Interval>().unwrap(), iv);
        }
        assert!("3d".parse::<Interval>().is_err());
    }
}
