//! Weighted Moving Average (WMA).
//!
//! Linear weights 1..=period, newest bar heaviest.

use super::{Indicator, IndicatorResult};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    name: String,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("wma.period", period)?;
        Ok(Self {
            period,
            name: format!("wma_{period}"),
        })
    }
}

impl Indicator for Wma {
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
                .with_param("period", self.period as f64);
        }
        IndicatorResult::new(&self.name, wma_of_series(&series.closes(), self.period))
            .with_param("period", self.period as f64)
    }
}

pub fn wma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    let denom = (period * (period + 1)) as f64 / 2.0;
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let weighted: f64 = window
            .iter()
            .enumerate()
            .map(|(j, v)| (j + 1) as f64 * v)
            .sum();
        result[i] = weighted / denom;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn wma_period_3() {
        // (1*1 + 2*2 + 3*3) / 6 = 14/6
        let r = Wma::new(3).unwrap().compute(&make_series(&[1.0, 2.0, 3.0]));
        assert_approx(r.values[2], 14.0 / 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wma_constant_series() {
        let r = wma_of_series(&[5.0; 6], 4);
        assert!(r[2].is_nan());
        for v in &r[3..] {
            assert_approx(*v, 5.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn wma_weights_recent_more_than_sma() {
        let rising = [1.0, 2.0, 3.0, 4.0, 5.0];
        let wma = wma_of_series(&rising, 5)[4];
        let sma = crate::indicators::sma_of_series(&rising, 5)[4];
        assert!(wma > sma);
    }
}
