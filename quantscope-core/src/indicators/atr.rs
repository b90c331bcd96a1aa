//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period) seeded from TR[1..=period],
//! so the first value lands at index `period` and needs period+1 bars.

use super::{Indicator, IndicatorResult};
use crate::domain::{Bar, PriceSeries};
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("atr.period", period)?;
        Ok(Self {
            period,
            name: format!("atr_{period}"),
        })
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    let Some(first) = bars.first() else {
        return tr;
    };
    tr[0] = first.high - first.low;
    for i in 1..bars.len() {
        let (h, l, pc) = (bars[i].high, bars[i].low, bars[i - 1].close);
        tr[i] = if h.is_nan() || l.is_nan() || pc.is_nan() {
            f64::NAN
        } else {
            (h - l).max((h - pc).abs()).max((l - pc).abs())
        };
    }
    tr
}

/// Wilder smoothing. Seed: mean of the first `period` consecutive non-NaN
/// values; a NaN after the seed taints the rest.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let Some(seed_start) = (0..=n - period)
        .find(|&i| values[i..i + period].iter().all(|v| !v.is_nan()))
    else {
        return result;
    };
    let seed_end = seed_start + period;
    let seed = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        let n = series.len();
        if n < self.min_bars() {
            return IndicatorResult::insufficient(&self.name, n, self.min_bars())
                .with_param("period", self.period as f64);
        }
        let mut tr = true_range(series.bars());
        // TR[0] has no previous close; start the seed at TR[1]
        tr[0] = f64::NAN;
        IndicatorResult::new(&self.name, wilder_smooth(&tr, self.period))
            .with_param("period", self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    fn ohlc_series(data: &[(f64, f64, f64, f64)]) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars = data
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| Bar::new(base + Duration::days(i as i64), o, h, l, c, 1000.0))
            .collect();
        PriceSeries::new("TEST", Interval::Day1, bars).unwrap()
    }

    #[test]
    fn true_range_basic() {
        let s = ohlc_series(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, 1, 8) = 9
        ]);
        let tr = true_range(s.bars());
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let s = ohlc_series(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        assert_approx(true_range(s.bars())[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_2() {
        let s = ohlc_series(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR 8
            (106.0, 107.0, 98.0, 99.0),   // TR 9
            (99.0, 103.0, 97.0, 101.0),   // TR 6
        ]);
        let r = Atr::new(2).unwrap().compute(&s);
        assert!(r.values[1].is_nan());
        assert_approx(r.values[2], 8.5, DEFAULT_EPSILON);
        assert_approx(r.values[3], 0.5 * 6.0 + 0.5 * 8.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_insufficient() {
        let s = ohlc_series(&[(1.0, 2.0, 0.5, 1.5)]);
        let r = Atr::new(14).unwrap().compute(&s);
        assert!(r.require().is_err());
    }

    #[test]
    fn wilder_skips_leading_nan() {
        let r = wilder_smooth(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(r[1].is_nan());
        assert_approx(r[2], 3.0, DEFAULT_EPSILON);
        assert_approx(r[3], 4.5, DEFAULT_EPSILON);
    }
}
