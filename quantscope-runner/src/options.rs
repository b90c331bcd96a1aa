//! Per-request overrides of the engine configuration.

use serde::{Deserialize, Serialize};

use quantscope_core::config::AnalyticsConfig;
use quantscope_core::error::require_confidence;
use quantscope_core::AnalyticsError;

/// Options for one `analyze_single_asset` or `analyze_portfolio` call.
/// Unset fields fall back to the engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// History to request instead of `engine.lookback_days`.
    pub lookback_days: Option<i64>,
    /// VaR/CVaR levels instead of `risk.confidence_levels`. The first level
    /// is also the portfolio VaR level.
    pub confidence_levels: Option<Vec<f64>>,
    /// Detect anomalies over only the most recent N bars.
    pub anomaly_window: Option<usize>,
}

impl AnalysisOptions {
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = Some(days);
        self
    }

    pub fn with_confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.confidence_levels = Some(levels);
        self
    }

    pub fn with_anomaly_window(mut self, bars: usize) -> Self {
        self.anomaly_window = Some(bars);
        self
    }

    /// Validate the overrides and fill the rest from `config`.
    pub(crate) fn resolve(&self, config: &AnalyticsConfig) -> Result<RequestPlan, AnalyticsError> {
        let lookback_days = self.lookback_days.unwrap_or(config.engine.lookback_days);
        if lookback_days <= 0 {
            return Err(AnalyticsError::invalid(
                "lookback_days",
                format!("must be positive, got {lookback_days}"),
            ));
        }
        let confidence_levels = match &self.confidence_levels {
            Some(levels) => {
                validate_levels(levels)?;
                levels.clone()
            }
            None => config.risk.confidence_levels.clone(),
        };
        if self.anomaly_window == Some(0) {
            return Err(AnalyticsError::invalid(
                "anomaly_window",
                "must be at least one bar",
            ));
        }
        Ok(RequestPlan {
            lookback_days,
            confidence_levels,
            anomaly_window: self.anomaly_window,
        })
    }
}

/// Options with every unset field taken from the engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RequestPlan {
    pub lookback_days: i64,
    pub confidence_levels: Vec<f64>,
    pub anomaly_window: Option<usize>,
}

impl RequestPlan {
    pub fn portfolio_confidence(&self) -> f64 {
        self.confidence_levels.first().copied().unwrap_or(0.95)
    }
}

pub(crate) fn validate_levels(levels: &[f64]) -> Result<(), AnalyticsError> {
    if levels.is_empty() {
        return Err(AnalyticsError::invalid(
            "confidence_levels",
            "at least one level is required",
        ));
    }
    levels.iter().try_for_each(|&c| require_confidence(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_config() {
        let config = AnalyticsConfig::default();
        let plan = AnalysisOptions::default().resolve(&config).unwrap();
        assert_eq!(plan.lookback_days, config.engine.lookback_days);
        assert_eq!(plan.confidence_levels, config.risk.confidence_levels);
        assert_eq!(plan.anomaly_window, None);
        assert_eq!(plan.portfolio_confidence(), config.risk.confidence_levels[0]);
    }

    #[test]
    fn overrides_replace_config() {
        let plan = AnalysisOptions::default()
            .with_lookback_days(90)
            .with_confidence_levels(vec![0.9])
            .with_anomaly_window(60)
            .resolve(&AnalyticsConfig::default())
            .unwrap();
        assert_eq!(plan.lookback_days, 90);
        assert_eq!(plan.confidence_levels, vec![0.9]);
        assert_eq!(plan.anomaly_window, Some(60));
        assert_eq!(plan.portfolio_confidence(), 0.9);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let config = AnalyticsConfig::default();
        for options in [
            AnalysisOptions::default().with_lookback_days(0),
            AnalysisOptions::default().with_confidence_levels(vec![]),
            AnalysisOptions::default().with_confidence_levels(vec![0.95, 1.0]),
            AnalysisOptions::default().with_anomaly_window(0),
        ] {
            let err = options.resolve(&config).unwrap_err();
            assert_eq!(err.kind(), "invalid_parameter", "{options:?}");
        }
    }

    #[test]
    fn options_parse_from_partial_json() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{ "anomaly_window": 30 }"#).unwrap();
        assert_eq!(options, AnalysisOptions::default().with_anomaly_window(30));
    }
}
