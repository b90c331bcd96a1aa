//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First valid value at index period-1.

use super::{sma_of_series, Indicator, IndicatorResult};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("sma.period", period)?;
        Ok(Self {
            period,
            name: format!("sma_{period}"),
        })
    }
}

impl Indicator for Sma {
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
        IndicatorResult::new(&self.name, sma_of_series(&series.closes(), self.period))
            .with_param("period", self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn sma_period_3() {
        let s = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let r = Sma::new(3).unwrap().compute(&s);
        assert!(r.values[0].is_nan());
        assert!(r.values[1].is_nan());
        assert_approx(r.values[2], 11.0, DEFAULT_EPSILON);
        assert_approx(r.values[3], 12.0, DEFAULT_EPSILON);
        assert_approx(r.values[4], 13.0, DEFAULT_EPSILON);
        assert!(r.is_ok());
    }

    #[test]
    fn sma_period_1_equals_close() {
        let closes = [5.0, 6.0, 7.0];
        let r = Sma::new(1).unwrap().compute(&make_series(&closes));
        assert_eq!(r.values, closes.to_vec());
    }

    #[test]
    fn sma_short_series_is_insufficient() {
        let r = Sma::new(10).unwrap().compute(&make_series(&[1.0, 2.0]));
        assert_eq!(r.len(), 2);
        assert!(!r.is_ok());
        assert!(r.require().is_err());
    }

    #[test]
    fn sma_zero_period_rejected() {
        assert!(Sma::new(0).is_err());
    }
}
