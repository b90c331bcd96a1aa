//! Volume indicators: OBV, PVT, Volume ROC, Volume SMA.
//!
//! - OBV: cumulative volume signed by the close-to-close direction, OBV[0] = 0.
//! - PVT: cumulative volume × relative close change, PVT[0] = 0.
//! - Volume ROC: 100 · (v[t] - v[t-p]) / v[t-p]; NaN when v[t-p] is zero.
//! - Volume SMA: rolling mean of volume.

use super::{sma_of_series, Indicator, IndicatorResult};
use crate::domain::PriceSeries;
use crate::error::{require_period, AnalyticsError};

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        if series.is_empty() {
            return IndicatorResult::insufficient("obv", 0, 1);
        }
        let closes = series.closes();
        let volumes = series.volumes();
        let mut out = vec![0.0; closes.len()];
        for i in 1..closes.len() {
            let step = if closes[i] > closes[i - 1] {
                volumes[i]
            } else if closes[i] < closes[i - 1] {
                -volumes[i]
            } else {
                0.0
            };
            out[i] = out[i - 1] + step;
        }
        IndicatorResult::new("obv", out)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pvt;

impl Indicator for Pvt {
    fn name(&self) -> &str {
        "pvt"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn compute(&self, series: &PriceSeries) -> IndicatorResult {
        if series.is_empty() {
            return IndicatorResult::insufficient("pvt", 0, 1);
        }
        let closes = series.closes();
        let volumes = series.volumes();
        let mut out = vec![0.0; closes.len()];
        for i in 1..closes.len() {
            let prev = closes[i - 1];
            let step = if prev != 0.0 {
                volumes[i] * (closes[i] - prev) / prev
            } else {
                0.0
            };
            out[i] = out[i - 1] + step;
        }
        IndicatorResult::new("pvt", out)
    }
}

#[derive(Debug, Clone)]
pub struct VolumeRoc {
    period: usize,
    name: String,
}

impl VolumeRoc {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("volume_roc.period", period)?;
        Ok(Self {
            period,
            name: format!("volume_roc_{period}"),
        })
    }
}

impl Indicator for VolumeRoc {
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
        let volumes = series.volumes();
        let mut out = vec![f64::NAN; n];
        for i in self.period..n {
            let base = volumes[i - self.period];
            if base > 0.0 {
                out[i] = 100.0 * (volumes[i] - base) / base;
            }
        }
        IndicatorResult::new(&self.name, out).with_param("period", self.period as f64)
    }
}

#[derive(Debug, Clone)]
pub struct VolumeSma {
    period: usize,
    name: String,
}

impl VolumeSma {
    pub fn new(period: usize) -> Result<Self, AnalyticsError> {
        require_period("volume_sma.period", period)?;
        Ok(Self {
            period,
            name: format!("volume_sma_{period}"),
        })
    }
}

impl Indicator for VolumeSma {
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
        IndicatorResult::new(&self.name, sma_of_series(&series.volumes(), self.period))
            .with_param("period", self.period as f64)
    }
}
