//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Needs period+1 bars (period changes) for the first value.
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0;
//! no movement at all → 50.

use super::{threshold_signals, Indicator, IndicatorResult};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    overbought: f64,
    oversold: f64,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("rsi.period", period)?;
        Ok(Self {
            period,
            overbought: 70.0,
            oversold: 30.0,
            name: format!("rsi_{period}"),
        })
    }

    pub fn with_thresholds(mut self, overbought: f64, oversold: f64) -> Self {
        self.overbought = overbought;
        self.oversold = oversold;
        self
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        let n = series.len();
        let result = if n < self.min_bars() {
            IndicatorResult::insufficient(&self.name, n, self.min_bars())
        } else {
            let values = rsi_of_series(&series.closes(), self.period);
            let signals = threshold_signals(&values, self.overbought, self.oversold);
            IndicatorResult::new(&self.name, values).with_signals(signals)
        };
        result
            .with_param("period", self.period as f64)
            .with_param("overbought", self.overbought)
            .with_param("oversold", self.oversold)
    }
}

pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let changes: Vec<f64> = std::iter::once(f64::NAN)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    // Seed: simple average gain and loss over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return result;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = compute_rsi(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = changes[i];
        if ch.is_nan() {
            return result;
        }
        let gain = ch.max(0.0);
        let loss = (-ch).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i] = compute_rsi(avg_gain, avg_loss);
    }
    result
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        (100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, IndicatorStatus, SignalKind};

    #[test]
    fn rsi_all_gains() {
        let r = Rsi::new(3)
            .unwrap()
            .compute(&make_series(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]));
        assert_approx(r.values[3], 100.0, 1e-6);
        assert_eq!(r.signals.as_ref().unwrap()[3], SignalKind::Overbought);
    }

    #[test]
    fn rsi_all_losses() {
        let r = Rsi::new(3)
            .unwrap()
            .compute(&make_series(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]));
        assert_approx(r.values[3], 0.0, 1e-6);
        assert_eq!(r.latest_signal(), Some(SignalKind::Oversold));
    }

    #[test]
    fn rsi_mixed() {
        // Changes: +0.34, -0.25, -0.48 → avg_gain = 0.34/3, avg_loss = 0.73/3
        // RSI[3] = 100 - 100/(1 + 0.34/0.73) ≈ 31.776
        let r = Rsi::new(3)
            .unwrap()
            .compute(&make_series(&[44.0, 44.34, 44.09, 43.61, 44.33]));
        assert!(r.values[..3].iter().all(|v| v.is_nan()));
        assert_approx(r.values[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_flat_is_fifty() {
        let r = Rsi::new(3).unwrap().compute(&make_series(&[10.0; 6]));
        assert_approx(r.values[5], 50.0, 1e-12);
    }

    #[test]
    fn rsi_14_on_seven_points_is_insufficient() {
        let r = Rsi::new(14)
            .unwrap()
            .compute(&make_series(&[100.0, 102.0, 101.0, 105.0, 107.0, 103.0, 99.0]));
        assert_eq!(r.len(), 7);
        assert!(r.values.iter().all(|v| v.is_nan()));
        assert_eq!(
            r.status,
            IndicatorStatus::InsufficientData {
                required: 15,
                available: 7
            }
        );
    }

    #[test]
    fn rsi_thresholds_come_from_configuration() {
        let s = make_series(&[100.0, 101.0, 100.5, 101.5, 101.0, 102.0, 101.8]);
        let strict = Rsi::new(3).unwrap().with_thresholds(99.0, 1.0).compute(&s);
        assert!(strict
            .signals
            .unwrap()
            .iter()
            .all(|s| *s == SignalKind::Neutral));
        let loose = Rsi::new(3).unwrap().with_thresholds(51.0, 49.0).compute(&s);
        assert!(loose
            .signals
            .unwrap()
            .iter()
            .any(|s| *s != SignalKind::Neutral));
    }

    #[test]
    fn rsi_nan_in_seed_gives_all_nan() {
        let r = rsi_of_series(&[100.0, 101.0, f64::NAN, 103.0, 104.0], 3);
        assert!(r.iter().all(|v| v.is_nan()));
    }
}
