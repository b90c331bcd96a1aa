//! Technical indicators.
//!
//! Indicators are pure functions of a single asset's `PriceSeries`. Every
//! output series has exactly one value per input bar; warm-up entries are
//! NaN. A series shorter than an indicator's minimum produces an all-NaN
//! result whose status is `InsufficientData`. Call `require()` to turn that
//! into an error.
//!
//! Multi-series indicators (MACD, Bollinger, Stochastic) put their primary
//! line in `values` and the rest in named auxiliary `series`.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod suite;
pub mod volume;
pub mod wma;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;
use crate::error::AnalyticsError;

pub use atr::Atr;
pub use bollinger::Bollinger;
pub use ema::Ema;
pub use macd::Macd;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use suite::{IndicatorSet, IndicatorSuite};
pub use volume::{Obv, Pvt, VolumeRoc, VolumeSma};
pub use wma::Wma;

/// Trait for indicators.
///
/// # Look-ahead guard
/// No value at bar t may depend on bar t+1 or later: computing over a
/// truncated series must reproduce the prefix of the full result.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g. "sma_20", "macd_12_26_9").
    fn name(&self) -> &str;

    /// Bars needed before the indicator produces its first complete output.
    fn min_bars(&self) -> usize;

    fn compute(&self, series: &PriceSeries) -> IndicatorResult;
}

/// Whether an indicator had enough input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndicatorStatus {
    Ok,
    InsufficientData { required: usize, available: usize },
}

/// Categorical reading of one indicator at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Neutral,
    Overbought,
    Oversold,
    BullishCrossover,
    BearishCrossover,
    UpperBandBreach,
    LowerBandBreach,
}

impl SignalKind {
    /// +1 for a bullish reading, -1 for bearish, 0 otherwise.
    ///
    /// Oversold and lower-band readings are treated as mean-reversion buys.
    pub fn bias(&self) -> i8 {
        match self {
            SignalKind::Oversold | SignalKind::BullishCrossover | SignalKind::LowerBandBreach => 1,
            SignalKind::Overbought | SignalKind::BearishCrossover | SignalKind::UpperBandBreach => {
                -1
            }
            SignalKind::Neutral => 0,
        }
    }
}

/// Output of one indicator over one series. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    /// Primary line, aligned 1:1 with the input bars.
    #[serde(with = "crate::serde_nan::vec")]
    pub values: Vec<f64>,
    /// Auxiliary lines (signal, histogram, bands, %D), same length as `values`.
    #[serde(default, with = "crate::serde_nan::map")]
    pub series: BTreeMap<String, Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<SignalKind>>,
    /// Parameters used.
    pub metadata: BTreeMap<String, f64>,
    pub status: IndicatorStatus,
}

impl IndicatorResult {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            series: BTreeMap::new(),
            signals: None,
            metadata: BTreeMap::new(),
            status: IndicatorStatus::Ok,
        }
    }

    /// All-NaN result for a series shorter than `required`.
    pub fn insufficient(name: impl Into<String>, len: usize, required: usize) -> Self {
        Self {
            status: IndicatorStatus::InsufficientData {
                required,
                available: len,
            },
            ..Self::new(name, vec![f64::NAN; len])
        }
    }

    pub fn with_series(mut self, name: &str, values: Vec<f64>) -> Self {
        self.series.insert(name.to_string(), values);
        self
    }

    pub fn with_signals(mut self, signals: Vec<SignalKind>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.metadata.insert(name.to_string(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_ok(&self) -> bool {
        self.status == IndicatorStatus::Ok
    }

    /// Convert an `InsufficientData` status into an error.
    pub fn require(self) -> Result<Self, AnalyticsError> {
        match self.status {
            IndicatorStatus::Ok => Ok(self),
            IndicatorStatus::InsufficientData {
                required,
                available,
            } => Err(AnalyticsError::insufficient(self.name, required, available)),
        }
    }

    /// Most recent finite value of the primary line.
    pub fn latest(&self) -> Option<f64> {
        self.values.iter().rev().copied().find(|v| v.is_finite())
    }

    /// Most recent finite value of an auxiliary line.
    pub fn latest_of(&self, series: &str) -> Option<f64> {
        self.series
            .get(series)?
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
    }

    pub fn latest_signal(&self) -> Option<SignalKind> {
        self.signals.as_ref()?.last().copied()
    }
}

/// Classify each value against an upper/lower threshold pair.
///
/// Strictly above `upper` is overbought, strictly below `lower` is oversold,
/// NaN is neutral.
pub(crate) fn threshold_signals(values: &[f64], upper: f64, lower: f64) -> Vec<SignalKind> {
    values
        .iter()
        .map(|&v| {
            if v > upper {
                SignalKind::Overbought
            } else if v < lower {
                SignalKind::Oversold
            } else {
                SignalKind::Neutral
            }
        })
        .collect()
}

/// Rolling mean over `period`, NaN for warm-up and windows containing NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

/// Create a daily fixture series from close prices.
///
/// Open = prev close, high/low = max/min(open, close) ± 1.0, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_closes("TEST", closes)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_converts_insufficient_status() {
        let r = IndicatorResult::insufficient("rsi_14", 7, 15);
        assert_eq!(r.len(), 7);
        assert!(r.values.iter().all(|v| v.is_nan()));
        let err = r.require().unwrap_err();
        assert_eq!(err, AnalyticsError::insufficient("rsi_14", 15, 7));
    }

    #[test]
    fn latest_skips_nan() {
        let r = IndicatorResult::new("x", vec![f64::NAN, 1.0, 2.0, f64::NAN]);
        assert_eq!(r.latest(), Some(2.0));
        assert_eq!(IndicatorResult::new("y", vec![f64::NAN]).latest(), None);
    }

    #[test]
    fn sma_of_series_basic() {
        let r = sma_of_series(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(r[0].is_nan());
        assert_approx(r[1], 1.5, DEFAULT_EPSILON);
        assert_approx(r[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn threshold_signals_are_strict() {
        let s = threshold_signals(&[70.0, 70.1, 30.0, 29.9, f64::NAN], 70.0, 30.0);
        assert_eq!(
            s,
            vec![
                SignalKind::Neutral,
                SignalKind::Overbought,
                SignalKind::Neutral,
                SignalKind::Oversold,
                SignalKind::Neutral
            ]
        );
    }

    #[test]
    fn result_json_keeps_nan_positions() {
        let r = IndicatorResult::new("sma_2", vec![f64::NAN, 1.5]).with_param("period", 2.0);
        let json = serde_json::to_string(&r).unwrap();
        let back: IndicatorResult = serde_json::from_str(&json).unwrap();
        assert!(back.values[0].is_nan());
        assert_eq!(back.values[1], 1.5);
        assert_eq!(back.metadata["period"], 2.0);
    }
}
