//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle (primary `values`): SMA(close, period)
//! - `upper` / `lower`: middle ± k · stddev(close, period)
//! - `percent_b`: (close - lower) / (upper - lower), NaN for zero width
//! - `bandwidth`: (upper - lower) / middle
//!
//! Uses population stddev (divide by N). Both bands are built from the same
//! offset, so they are symmetric around the middle.

use super::{Indicator, IndicatorResult, SignalKind};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, AnalyticsError> {
        require_period("bollinger.period", period)?;
        if !(multiplier > 0.0) {
            return Err(AnalyticsError::invalid(
                "bollinger.multiplier",
                "must be positive",
            ));
        }
        Ok(Self {
            period,
            multiplier,
            name: format!("bollinger_{period}_{multiplier}"),
        })
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        let n = series.len();
        if n < self.period {
            return IndicatorResult::insufficient(&self.name, n, self.period)
                .with_series("upper", vec![f64::NAN; n])
                .with_series("lower", vec![f64::NAN; n])
                .with_series("percent_b", vec![f64::NAN; n])
                .with_series("bandwidth", vec![f64::NAN; n])
                .with_param("period", self.period as f64)
                .with_param("multiplier", self.multiplier);
        }

        let closes = series.closes();
        let mut middle = vec![f64::NAN; n];
        let mut upper = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];
        let mut percent_b = vec![f64::NAN; n];
        let mut bandwidth = vec![f64::NAN; n];
        let mut signals = vec![SignalKind::Neutral; n];

        for i in (self.period - 1)..n {
            let window = &closes[i + 1 - self.period..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let variance =
                window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.period as f64;
            let offset = self.multiplier * variance.sqrt();

            middle[i] = mean;
            upper[i] = mean + offset;
            lower[i] = mean - offset;
            let width = upper[i] - lower[i];
            if width > 0.0 {
                percent_b[i] = (closes[i] - lower[i]) / width;
            }
            if mean != 0.0 {
                bandwidth[i] = width / mean;
            }
            if closes[i] > upper[i] {
                signals[i] = SignalKind::UpperBandBreach;
            } else if closes[i] < lower[i] {
                signals[i] = SignalKind::LowerBandBreach;
            }
        }

        IndicatorResult::new(&self.name, middle)
            .with_series("upper", upper)
            .with_series("lower", lower)
            .with_series("percent_b", percent_b)
            .with_series("bandwidth", bandwidth)
            .with_signals(signals)
            .with_param("period", self.period as f64)
            .with_param("multiplier", self.multiplier)
    }
}
