//! Volatility and risk analysis for a single asset.
//!
//! `RiskAnalyzer::analyze` produces a `RiskReport`: the headline
//! `RiskMetrics` plus every VaR method at every requested level, the
//! volatility estimators, drawdown detail and the volatility regime.
//!
//! Inputs are log returns of closes; fewer than `min_observations` returns
//! is `InsufficientData`.

pub mod drawdown;
pub mod ratios;
pub mod var;
pub mod volatility;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::budget::Deadline;
use crate::config::RiskConfig;
use crate::data::aligned_returns;
use crate::domain::PriceSeries;
use crate::error::{require_confidence, AnalyticsError};
use crate::rng::RngHierarchy;

pub use drawdown::{drawdown_stats, max_drawdown, DrawdownStats};
pub use ratios::{beta, excess_kurtosis, skewness, sharpe_ratio, sortino_ratio};
pub use var::{historical_var, monte_carlo_var, parametric_var, VarEstimate, VarMethod};
pub use volatility::VolatilityRegime;

/// Levels always reported in the headline metrics.
pub const HEADLINE_LEVELS: [f64; 2] = [0.95, 0.99];

/// Headline risk figures for one asset. VaR/CVaR are positive loss
/// magnitudes per period, computed with the configured method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: f64,
    /// Annualized historical volatility.
    pub volatility: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReport {
    pub historical: f64,
    /// `None` when a bar in the window lacked usable high/low.
    pub parkinson: Option<f64>,
    pub garman_klass: Option<f64>,
    pub ewma: f64,
    pub garch: f64,
    /// EWMA one-step-ahead forecast, annualized.
    pub forecast: f64,
    pub regime: VolatilityRegime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub symbol: String,
    pub observations: usize,
    pub var_method: VarMethod,
    pub metrics: RiskMetrics,
    /// Every method at every requested level.
    pub var_estimates: Vec<VarEstimate>,
    pub volatility: VolatilityReport,
    pub drawdown: DrawdownStats,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    /// Estimators that were skipped, with the reason.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RiskReport {
    pub fn estimate(&self, method: VarMethod, confidence: f64) -> Option<&VarEstimate> {
        self.var_estimates
            .iter()
            .find(|e| e.method == method && (e.confidence - confidence).abs() < 1e-12)
    }
}

pub struct RiskAnalyzer {
    config: RiskConfig,
    rng: RngHierarchy,
}

impl RiskAnalyzer {
    pub fn new(config: RiskConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let rng = RngHierarchy::new(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Report at the configured confidence levels.
    pub fn analyze(
        &self,
        series: &PriceSeries,
        benchmark: Option<&PriceSeries>,
        deadline: &Deadline,
    ) -> Result<RiskReport, AnalyticsError> {
        self.analyze_at(series, benchmark, &self.config.confidence_levels, deadline)
    }

    pub fn analyze_at(
        &self,
        series: &PriceSeries,
        benchmark: Option<&PriceSeries>,
        confidence_levels: &[f64],
        deadline: &Deadline,
    ) -> Result<RiskReport, AnalyticsError> {
        if confidence_levels.is_empty() {
            return Err(AnalyticsError::invalid(
                "confidence_levels",
                "at least one level is required",
            ));
        }
        for &c in confidence_levels {
            require_confidence(c)?;
        }

        let cfg = &self.config;
        let symbol = series.symbol();
        let returns: Vec<f64> = series
            .log_returns()
            .into_iter()
            .filter(|r| !r.is_nan())
            .collect();
        if returns.len() < cfg.min_observations {
            return Err(AnalyticsError::insufficient(
                format!("risk metrics for {symbol}"),
                cfg.min_observations,
                returns.len(),
            ));
        }
        deadline.check("risk analysis")?;

        let mut warnings = Vec::new();
        let volatility = self.volatility_report(series, &returns, &mut warnings);

        let mut levels: Vec<f64> = confidence_levels.to_vec();
        for c in HEADLINE_LEVELS {
            if !levels.iter().any(|l| (l - c).abs() < 1e-12) {
                levels.push(c);
            }
        }
        let mut var_estimates = Vec::with_capacity(levels.len() * VarMethod::ALL.len());
        for &c in &levels {
            var_estimates.push(parametric_var(&returns, c)?);
            var_estimates.push(historical_var(&returns, c)?);
        }
        deadline.check("risk analysis")?;
        let mut mc_rng = self.rng.rng_for(symbol, "monte_carlo_var", 0);
        var_estimates.extend(monte_carlo_var(
            &returns,
            &levels,
            cfg.monte_carlo_simulations,
            &mut mc_rng,
        )?);

        let headline = |c: f64| -> Result<VarEstimate, AnalyticsError> {
            var_estimates
                .iter()
                .find(|e| e.method == cfg.var_method && (e.confidence - c).abs() < 1e-12)
                .copied()
                .ok_or_else(|| AnalyticsError::component("risk", format!("no estimate at {c}")))
        };
        let (h95, h99) = (headline(0.95)?, headline(0.99)?);

        // Only the requested levels are reported in detail.
        var_estimates.retain(|e| {
            confidence_levels
                .iter()
                .any(|c| (e.confidence - c).abs() < 1e-12)
        });

        let drawdown = drawdown_stats(&series.closes());
        let beta = benchmark.and_then(|b| self.beta_against(series, b, &mut warnings));

        let metrics = RiskMetrics {
            var_95: h95.var,
            var_99: h99.var,
            cvar_95: h95.cvar,
            cvar_99: h99.cvar,
            sharpe_ratio: sharpe_ratio(&returns, cfg.risk_free_rate, cfg.periods_per_year),
            sortino_ratio: sortino_ratio(&returns, cfg.risk_free_rate, cfg.periods_per_year),
            max_drawdown: drawdown.max_drawdown,
            volatility: volatility.historical,
            beta,
        };

        debug!(
            symbol,
            observations = returns.len(),
            volatility = metrics.volatility,
            var_95 = metrics.var_95,
            regime = volatility.regime.as_str(),
            "risk analysis complete"
        );

        Ok(RiskReport {
            symbol: symbol.to_string(),
            observations: returns.len(),
            var_method: cfg.var_method,
            metrics,
            var_estimates,
            volatility,
            drawdown,
            skewness: skewness(&returns),
            excess_kurtosis: excess_kurtosis(&returns),
            benchmark: benchmark.map(|b| b.symbol().to_string()),
            warnings,
        })
    }

    fn volatility_report(
        &self,
        series: &PriceSeries,
        returns: &[f64],
        warnings: &mut Vec<String>,
    ) -> VolatilityReport {
        let cfg = &self.config;
        let ppy = cfg.periods_per_year;
        let window = cfg.volatility_window;

        let historical = volatility::historical_volatility(returns, window, ppy);

        let mut range_estimate = |name: &str, r: Result<f64, AnalyticsError>| match r {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(symbol = series.symbol(), estimator = name, error = %e, "volatility estimator skipped");
                warnings.push(format!("{name}: {e}"));
                None
            }
        };
        let parkinson = range_estimate(
            "parkinson",
            volatility::parkinson_volatility(series.bars(), window, ppy),
        );
        let garman_klass = range_estimate(
            "garman_klass",
            volatility::garman_klass_volatility(series.bars(), window, ppy),
        );

        let ewma_path = volatility::ewma_variance_path(returns, cfg.ewma_lambda);
        let garch_path = volatility::garch_variance_path(returns);
        // path[n] is the forecast, path[n-1] the estimate for the latest bar
        let n = returns.len();
        let ewma = volatility::annualize_variance(ewma_path[n - 1], ppy);
        let forecast = volatility::annualize_variance(ewma_path[n], ppy);
        let garch = volatility::annualize_variance(garch_path[n], ppy);

        VolatilityReport {
            historical,
            parkinson,
            garman_klass,
            ewma,
            garch,
            forecast,
            regime: VolatilityRegime::classify(historical, &cfg.regime_thresholds),
        }
    }

    fn beta_against(
        &self,
        series: &PriceSeries,
        benchmark: &PriceSeries,
        warnings: &mut Vec<String>,
    ) -> Option<f64> {
        let (a, b) = aligned_returns(series, benchmark);
        let (a, b): (Vec<f64>, Vec<f64>) = a
            .into_iter()
            .zip(b)
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .unzip();
        if a.len() < self.config.min_observations {
            warn!(
                symbol = series.symbol(),
                benchmark = benchmark.symbol(),
                overlap = a.len(),
                "too little overlap with benchmark, beta skipped"
            );
            warnings.push(format!(
                "beta: {} overlapping returns with {}, need {}",
                a.len(),
                benchmark.symbol(),
                self.config.min_observations
            ));
            return None;
        }
        beta(&a, &b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticProvider;
    use crate::domain::Interval;
    use chrono::{TimeZone, Utc};

    fn synthetic(symbol: &str, days: i64) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::days(days);
        let bars = SyntheticProvider::new(7).generate(symbol, start, end, Interval::Day1);
        PriceSeries::new(symbol, Interval::Day1, bars).unwrap()
    }

    fn analyzer() -> RiskAnalyzer {
        RiskAnalyzer::new(RiskConfig::default()).unwrap()
    }

    #[test]
    fn report_orders_var_and_cvar() {
        let s = synthetic("AAPL", 500);
        let r = analyzer().analyze(&s, None, &Deadline::unbounded()).unwrap();
        let m = &r.metrics;
        assert!(m.var_99 >= m.var_95);
        assert!(m.cvar_95 >= m.var_95);
        assert!(m.cvar_99 >= m.var_99);
        assert!(m.volatility > 0.0);
        assert!(m.beta.is_none());
        assert_eq!(r.var_estimates.len(), 6);
        for method in VarMethod::ALL {
            let e95 = r.estimate(method, 0.95).unwrap();
            let e99 = r.estimate(method, 0.99).unwrap();
            assert!(e99.var >= e95.var, "{method:?}");
        }
    }

    #[test]
    fn flat_series_has_no_risk() {
        let s = PriceSeries::from_closes("FLAT", &[50.0; 60]);
        let r = analyzer().analyze(&s, None, &Deadline::unbounded()).unwrap();
        assert_eq!(r.metrics.volatility, 0.0);
        assert_eq!(r.metrics.var_95, 0.0);
        assert_eq!(r.metrics.cvar_99, 0.0);
        assert_eq!(r.metrics.sharpe_ratio, None);
        assert_eq!(r.metrics.max_drawdown, 0.0);
        assert_eq!(r.volatility.regime, VolatilityRegime::Low);
    }

    #[test]
    fn short_series_is_insufficient() {
        let s = PriceSeries::from_closes("X", &[1.0, 2.0, 3.0]);
        let err = analyzer().analyze(&s, None, &Deadline::unbounded()).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn beta_against_itself_is_one() {
        let s = synthetic("MSFT", 300);
        let r = analyzer().analyze(&s, Some(&s), &Deadline::unbounded()).unwrap();
        assert!((r.metrics.beta.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(r.benchmark.as_deref(), Some("MSFT"));
    }

    #[test]
    fn custom_levels_still_fill_headline() {
        let s = synthetic("NVDA", 400);
        let r = analyzer()
            .analyze_at(&s, None, &[0.9], &Deadline::unbounded())
            .unwrap();
        assert_eq!(r.var_estimates.len(), 3);
        assert!(r.var_estimates.iter().all(|e| e.confidence == 0.9));
        assert!(r.metrics.var_99 >= r.metrics.var_95);
    }

    #[test]
    fn rejects_invalid_level() {
        let s = synthetic("NVDA", 200);
        let err = analyzer()
            .analyze_at(&s, None, &[1.5], &Deadline::unbounded())
            .unwrap_err();
        assert!(err.is_terminal());
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let s = synthetic("AMD", 300);
        let a = analyzer().analyze(&s, None, &Deadline::unbounded()).unwrap();
        let b = analyzer().analyze(&s, None, &Deadline::unbounded()).unwrap();
        assert_eq!(a, b);
    }
}
