//! The configured indicator set for one series.

use std::collections::BTreeMap;

use super::{
    Atr, Bollinger, Ema, Indicator, IndicatorResult, Macd, Obv, Pvt, Rsi, Sma, Stochastic,
    VolumeRoc, VolumeSma, Wma,
};
use crate::budget::Deadline;
use crate::config::IndicatorConfig;
use crate::domain::PriceSeries;
use crate::error::AnalyticsError;

/// Indicator outputs keyed by indicator name.
pub type IndicatorSet = BTreeMap<String, IndicatorResult>;

/// Every indicator named in an `IndicatorConfig`, built once and reused.
pub struct IndicatorSuite {
    indicators: Vec<Box<dyn Indicator>>,
    rsi: String,
    macd: String,
    bollinger: String,
    stochastic: String,
    atr: String,
}

impl IndicatorSuite {
    pub fn from_config(config: &IndicatorConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;

        let rsi = Rsi::new(config.rsi_period)?
            .with_thresholds(config.rsi_overbought, config.rsi_oversold);
        let macd = Macd::new(config.macd_fast, config.macd_slow, config.macd_signal)?;
        let bollinger = Bollinger::new(config.bollinger_period, config.bollinger_k)?;
        let stochastic = Stochastic::new(config.stochastic_k, config.stochastic_d)?
            .with_thresholds(config.stochastic_overbought, config.stochastic_oversold);
        let atr = Atr::new(config.atr_period)?;

        let keys = (
            rsi.name().to_string(),
            macd.name().to_string(),
            bollinger.name().to_string(),
            stochastic.name().to_string(),
            atr.name().to_string(),
        );

        let mut indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(rsi),
            Box::new(macd),
            Box::new(bollinger),
            Box::new(stochastic),
            Box::new(atr),
            Box::new(Obv),
            Box::new(Pvt),
            Box::new(VolumeRoc::new(config.volume_roc_period)?),
            Box::new(VolumeSma::new(config.volume_sma_period)?),
        ];
        let mut periods = config.moving_averages.clone();
        periods.sort_unstable();
        periods.dedup();
        for p in periods {
            indicators.push(Box::new(Sma::new(p)?));
            indicators.push(Box::new(Ema::new(p)?));
            indicators.push(Box::new(Wma::new(p)?));
        }

        Ok(Self {
            indicators,
            rsi: keys.0,
            macd: keys.1,
            bollinger: keys.2,
            stochastic: keys.3,
            atr: keys.4,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Compute every indicator. Short series yield `InsufficientData`
    /// statuses, never an error.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSet {
        self.indicators
            .iter()
            .map(|i| (i.name().to_string(), i.compute(series)))
            .collect()
    }

    /// Like `compute`, checking the deadline between indicators.
    pub fn compute_within(
        &self,
        series: &PriceSeries,
        deadline: &Deadline,
    ) -> Result<IndicatorSet, AnalyticsError> {
        let mut out = IndicatorSet::new();
        for indicator in &self.indicators {
            deadline.check("indicators")?;
            out.insert(indicator.name().to_string(), indicator.compute(series));
        }
        Ok(out)
    }

    pub fn rsi_key(&self) -> &str {
        &self.rsi
    }

    pub fn macd_key(&self) -> &str {
        &self.macd
    }

    pub fn bollinger_key(&self) -> &str {
        &self.bollinger
    }

    pub fn stochastic_key(&self) -> &str {
        &self.stochastic
    }

    pub fn atr_key(&self) -> &str {
        &self.atr
    }
}

impl std::fmt::Debug for IndicatorSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorSuite")
            .field("indicators", &self.names())
            .finish()
    }
}
