//! Multi-asset time alignment.
//!
//! Inner join on timestamp: a row exists only where every input series has
//! a bar. Nothing is forward-filled.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{log_returns, PriceSeries};

/// Close prices of several assets on their common timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPanel {
    /// Common timestamps, ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Symbols in input order.
    pub symbols: Vec<String>,
    /// One close column per symbol, each `timestamps.len()` long.
    pub closes: Vec<Vec<f64>>,
}

impl AlignedPanel {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        let idx = self.symbols.iter().position(|s| s == symbol)?;
        Some(&self.closes[idx])
    }

    /// Log returns per column, each `len() - 1` long.
    pub fn returns(&self) -> Vec<Vec<f64>> {
        self.closes.iter().map(|c| log_returns(c)).collect()
    }
}

/// Align series on the timestamps they all share.
pub fn align_inner(series: &[&PriceSeries]) -> AlignedPanel {
    let symbols: Vec<String> = series.iter().map(|s| s.symbol().to_string()).collect();
    let Some((first, rest)) = series.split_first() else {
        return AlignedPanel {
            timestamps: Vec::new(),
            symbols,
            closes: Vec::new(),
        };
    };

    let lookups: Vec<HashMap<DateTime<Utc>, f64>> = rest
        .iter()
        .map(|s| s.bars().iter().map(|b| (b.timestamp, b.close)).collect())
        .collect();

    let mut timestamps = Vec::new();
    let mut closes: Vec<Vec<f64>> = vec![Vec::new(); series.len()];
    // first series is already sorted, so the output is too
    for bar in first.bars() {
        let others: Option<Vec<f64>> = lookups
            .iter()
            .map(|m| m.get(&bar.timestamp).copied())
            .collect();
        if let Some(others) = others {
            timestamps.push(bar.timestamp);
            closes[0].push(bar.close);
            for (col, v) in closes[1..].iter_mut().zip(others) {
                col.push(v);
            }
        }
    }

    AlignedPanel {
        timestamps,
        symbols,
        closes,
    }
}

/// Aligned log returns of two series, for beta and pairwise correlation.
pub fn aligned_returns(a: &PriceSeries, b: &PriceSeries) -> (Vec<f64>, Vec<f64>) {
    let panel = align_inner(&[a, b]);
    let mut returns = panel.returns().into_iter();
    let ra = returns.next().unwrap_or_default();
    let rb = returns.next().unwrap_or_default();
    (ra, rb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Interval};
    use chrono::TimeZone;

    fn series(symbol: &str, days: &[u32], close: f64) -> PriceSeries {
        let bars = days
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let ts = Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
                let c = close + i as f64;
                Bar::new(ts, c, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect();
        PriceSeries::new(symbol, Interval::Day1, bars).unwrap()
    }

    #[test]
    fn inner_join_keeps_common_timestamps_only() {
        let spy = series("SPY", &[2, 3, 4], 100.0);
        let qqq = series("QQQ", &[2, 4], 200.0);

        let panel = align_inner(&[&spy, &qqq]);

        assert_eq!(panel.len(), 2);
        assert_eq!(panel.column("SPY").unwrap(), &[100.0, 102.0]);
        assert_eq!(panel.column("QQQ").unwrap(), &[200.0, 201.0]);
    }

    #[test]
    fn no_overlap_gives_empty_panel() {
        let a = series("A", &[2, 3], 1.0);
        let b = series("B", &[8, 9], 1.0);
        assert!(align_inner(&[&a, &b]).is_empty());
    }

    #[test]
    fn single_series_is_unchanged() {
        let a = series("A", &[2, 3, 4], 10.0);
        let panel = align_inner(&[&a]);
        assert_eq!(panel.closes[0], a.closes());
        assert_eq!(panel.returns()[0].len(), 2);
    }

    #[test]
    fn aligned_returns_have_equal_length() {
        let a = series("A", &[2, 3, 4, 5], 10.0);
        let b = series("B", &[3, 4, 5, 8], 20.0);
        let (ra, rb) = aligned_returns(&a, &b);
        assert_eq!(ra.len(), 2);
        assert_eq!(rb.len(), 2);
    }
}
