//! Stochastic Oscillator.
//!
//! %K = 100 · (close - lowest low) / (highest high - lowest low) over k bars;
//! a flat range (high == low) gives 50. %D = SMA(%K, d).
//! Primary `values` is %K; `percent_d` is auxiliary.

use super::{sma_of_series, threshold_signals, Indicator, IndicatorResult};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
    overbought: f64,
    oversold: f64,
    name: String,
}

impl Stochastic {
    pub fn new(k_period: usize, d_period: usize) -> Result<Self, AnalyticsError> {
        require_period("stochastic.k", k_period)?;
        require_period("stochastic.d", d_period)?;
        Ok(Self {
            k_period,
            d_period,
            overbought: 80.0,
            oversold: 20.0,
            name: format!("stochastic_{k_period}_{d_period}"),
        })
    }

    pub fn with_thresholds(mut self, overbought: f64, oversold: f64) -> Self {
        self.overbought = overbought;
        self.oversold = oversold;
        self
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        let n = series.len();
        let result = if n < self.min_bars() {
            IndicatorResult::insufficient(&self.name, n, self.min_bars())
                .with_series("percent_d", vec![f64::NAN; n])
        } else {
            let k = percent_k(&series.highs(), &series.lows(), &series.closes(), self.k_period);
            let d = sma_of_series(&k, self.d_period);
            let signals = threshold_signals(&k, self.overbought, self.oversold);
            IndicatorResult::new(&self.name, k)
                .with_series("percent_d", d)
                .with_signals(signals)
        };
        result
            .with_param("k_period", self.k_period as f64)
            .with_param("d_period", self.d_period as f64)
            .with_param("overbought", self.overbought)
            .with_param("oversold", self.oversold)
    }
}

pub fn percent_k(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let start = i + 1 - period;
        let hh = highs[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ll = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let has_nan = highs[start..=i].iter().chain(&lows[start..=i]).any(|v| v.is_nan());
        if has_nan || closes[i].is_nan() {
            continue;
        }
        let range = hh - ll;
        result[i] = if range > 0.0 {
            (100.0 * (closes[i] - ll) / range).clamp(0.0, 100.0)
        } else {
            50.0
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Interval};
    use crate::indicators::{assert_approx, make_series, SignalKind, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn percent_k_known_values() {
        let highs = [10.0, 12.0, 11.0];
        let lows = [8.0, 9.0, 7.0];
        let closes = [9.0, 11.0, 10.0];
        let k = percent_k(&highs, &lows, &closes, 3);
        // hh = 12, ll = 7 → 100 * 3 / 5
        assert_approx(k[2], 60.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_range_is_fifty() {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..6)
            .map(|i| Bar::new(base + Duration::days(i), 5.0, 5.0, 5.0, 5.0, 1.0))
            .collect();
        let s = PriceSeries::new("FLAT", Interval::Day1, bars).unwrap();
        let r = Stochastic::new(3, 2).unwrap().compute(&s);
        assert_approx(r.values[5], 50.0, DEFAULT_EPSILON);
        assert_approx(r.series["percent_d"][5], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn percent_d_is_sma_of_k() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + ((i * 5) % 9) as f64).collect();
        let r = Stochastic::new(14, 3).unwrap().compute(&make_series(&closes));
        let d = &r.series["percent_d"];
        assert!(d[14].is_nan());
        let expected = (r.values[14] + r.values[15] + r.values[16]) / 3.0;
        assert_approx(d[16], expected, 1e-9);
        assert!(r.values.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn steady_rise_reads_overbought() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 3.0).collect();
        let r = Stochastic::new(5, 3).unwrap().compute(&make_series(&closes));
        assert_eq!(r.latest_signal(), Some(SignalKind::Overbought));
    }
}
