//! Moving Average Convergence Divergence (MACD).
//!
//! MACD = EMA(fast) - EMA(slow); signal = EMA(MACD, signal period);
//! histogram = MACD - signal, computed per bar so the identity is exact.
//! Primary `values` is the MACD line; `signal` and `histogram` are
//! auxiliary series.

use super::ema::ema_of_series;
use super::{Indicator, IndicatorResult, SignalKind};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, AnalyticsError> {
        require_period("macd.fast", fast)?;
        require_period("macd.slow", slow)?;
        require_period("macd.signal", signal)?;
        if fast >= slow {
            return Err(AnalyticsError::invalid(
                "macd.fast",
                format!("fast period {fast} must be shorter than slow period {slow}"),
            ));
        }
        Ok(Self {
            fast,
            slow,
            signal,
            name: format!("macd_{fast}_{slow}_{signal}"),
        })
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.slow + self.signal - 1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        let n = series.len();
        let result = if n < self.min_bars() {
            IndicatorResult::insufficient(&self.name, n, self.min_bars())
                .with_series("signal", vec![f64::NAN; n])
                .with_series("histogram", vec![f64::NAN; n])
        } else {
            let closes = series.closes();
            let fast = ema_of_series(&closes, self.fast);
            let slow = ema_of_series(&closes, self.slow);
            let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
            let signal = ema_of_series(&line, self.signal);
            let histogram: Vec<f64> = line.iter().zip(&signal).map(|(m, s)| m - s).collect();
            let signals = crossover_signals(&histogram);
            IndicatorResult::new(&self.name, line)
                .with_series("signal", signal)
                .with_series("histogram", histogram)
                .with_signals(signals)
        };
        result
            .with_param("fast", self.fast as f64)
            .with_param("slow", self.slow as f64)
            .with_param("signal", self.signal as f64)
    }
}

/// Crossover when the histogram changes sign between consecutive bars.
fn crossover_signals(histogram: &[f64]) -> Vec<SignalKind> {
    let mut signals = vec![SignalKind::Neutral; histogram.len()];
    for i in 1..histogram.len() {
        let (prev, cur) = (histogram[i - 1], histogram[i]);
        if prev.is_nan() || cur.is_nan() {
            continue;
        }
        if prev <= 0.0 && cur > 0.0 {
            signals[i] = SignalKind::BullishCrossover;
        } else if prev >= 0.0 && cur < 0.0 {
            signals[i] = SignalKind::BearishCrossover;
        }
    }
    signals
}
