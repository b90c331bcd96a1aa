//! Serializable analytics configuration.
//!
//! Every section carries `#[serde(default)]`, so a TOML file only needs the
//! keys it overrides:
//!
//! ```toml
//! [indicators]
//! rsi_period = 21
//!
//! [risk]
//! confidence_levels = [0.9, 0.95, 0.99]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anomaly::{registry, VotingRule};
use crate::domain::Interval;
use crate::error::{require_confidence, require_period, AnalyticsError};
use crate::risk::VarMethod;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] AnalyticsError),
}

/// Complete configuration for one analytics engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub indicators: IndicatorConfig,
    pub correlation: CorrelationConfig,
    pub risk: RiskConfig,
    pub anomaly: AnomalyConfig,
    pub engine: EngineConfig,
}

impl AnalyticsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        self.indicators.validate()?;
        self.correlation.validate()?;
        self.risk.validate()?;
        self.anomaly.validate()?;
        self.engine.validate()
    }
}

// ─── Indicators ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    /// Periods for the SMA/EMA/WMA families.
    pub moving_averages: Vec<usize>,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub stochastic_overbought: f64,
    pub stochastic_oversold: f64,
    pub atr_period: usize,
    pub volume_sma_period: usize,
    pub volume_roc_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
            moving_averages: vec![10, 20, 50, 200],
            stochastic_k: 14,
            stochastic_d: 3,
            stochastic_overbought: 80.0,
            stochastic_oversold: 20.0,
            atr_period: 14,
            volume_sma_period: 20,
            volume_roc_period: 12,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        require_period("rsi_period", self.rsi_period)?;
        require_period("macd_fast", self.macd_fast)?;
        require_period("macd_slow", self.macd_slow)?;
        require_period("macd_signal", self.macd_signal)?;
        require_period("bollinger_period", self.bollinger_period)?;
        require_period("stochastic_k", self.stochastic_k)?;
        require_period("stochastic_d", self.stochastic_d)?;
        require_period("atr_period", self.atr_period)?;
        require_period("volume_sma_period", self.volume_sma_period)?;
        require_period("volume_roc_period", self.volume_roc_period)?;
        for &p in &self.moving_averages {
            require_period("moving_averages", p)?;
        }
        if self.macd_fast >= self.macd_slow {
            return Err(AnalyticsError::invalid(
                "macd_fast",
                "fast period must be shorter than slow period",
            ));
        }
        if !(self.bollinger_k > 0.0) {
            return Err(AnalyticsError::invalid("bollinger_k", "must be positive"));
        }
        check_band("rsi", self.rsi_oversold, self.rsi_overbought)?;
        check_band(
            "stochastic",
            self.stochastic_oversold,
            self.stochastic_overbought,
        )
    }
}

fn check_band(name: &str, low: f64, high: f64) -> Result<(), AnalyticsError> {
    if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
        return Err(AnalyticsError::invalid(
            format!("{name}_thresholds"),
            format!("need 0 <= oversold ({low}) < overbought ({high}) <= 100"),
        ));
    }
    Ok(())
}

// ─── Correlation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Pairs with fewer overlapping observations are excluded.
    pub min_periods: usize,
    /// Two-sided significance level for the pair test.
    pub p_value_threshold: f64,
    pub rolling_window: usize,
    /// Rolling values further than this many standard deviations from the
    /// full-period baseline are flagged as regime changes.
    pub regime_deviation_sigma: f64,
    /// Correlate log returns (true) or raw closes (false).
    pub use_returns: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_periods: 30,
            p_value_threshold: 0.05,
            rolling_window: 30,
            regime_deviation_sigma: 2.0,
            use_returns: true,
        }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.min_periods < 3 {
            return Err(AnalyticsError::invalid("min_periods", "must be >= 3"));
        }
        if self.rolling_window < 3 {
            return Err(AnalyticsError::invalid("rolling_window", "must be >= 3"));
        }
        if !(self.p_value_threshold > 0.0 && self.p_value_threshold < 1.0) {
            return Err(AnalyticsError::invalid(
                "p_value_threshold",
                "must be in (0, 1)",
            ));
        }
        if !(self.regime_deviation_sigma > 0.0) {
            return Err(AnalyticsError::invalid(
                "regime_deviation_sigma",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ─── Risk ────────────────────────────────────────────────────────────

/// Annualized volatility cut-offs: below `low` is Low, below `medium` is
/// Medium, below `high` is High, otherwise Extreme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for VolatilityThresholds {
    fn default() -> Self {
        Self {
            low: 0.15,
            medium: 0.25,
            high: 0.40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Rolling window (bars) for historical volatility.
    pub volatility_window: usize,
    /// Periods per year; volatility is scaled by its square root.
    pub periods_per_year: f64,
    pub ewma_lambda: f64,
    pub confidence_levels: Vec<f64>,
    /// Annual risk-free rate.
    pub risk_free_rate: f64,
    /// Method used for the headline `var_*`/`cvar_*` fields.
    pub var_method: VarMethod,
    /// Minimum number of returns for any risk computation.
    pub min_observations: usize,
    pub monte_carlo_simulations: usize,
    pub seed: u64,
    pub regime_thresholds: VolatilityThresholds,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            volatility_window: 252,
            periods_per_year: 252.0,
            ewma_lambda: 0.94,
            confidence_levels: vec![0.95, 0.99],
            risk_free_rate: 0.02,
            var_method: VarMethod::Historical,
            min_observations: 30,
            monte_carlo_simulations: 10_000,
            seed: 42,
            regime_thresholds: VolatilityThresholds::default(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        require_period("volatility_window", self.volatility_window)?;
        if self.volatility_window < 2 {
            return Err(AnalyticsError::invalid("volatility_window", "must be >= 2"));
        }
        if !(self.periods_per_year > 0.0) {
            return Err(AnalyticsError::invalid("periods_per_year", "must be positive"));
        }
        if !(self.ewma_lambda > 0.0 && self.ewma_lambda < 1.0) {
            return Err(AnalyticsError::invalid("ewma_lambda", "must be in (0, 1)"));
        }
        if self.confidence_levels.is_empty() {
            return Err(AnalyticsError::invalid(
                "confidence_levels",
                "at least one level is required",
            ));
        }
        for &c in &self.confidence_levels {
            require_confidence(c)?;
        }
        if self.min_observations < 2 {
            return Err(AnalyticsError::invalid("min_observations", "must be >= 2"));
        }
        if self.monte_carlo_simulations == 0 {
            return Err(AnalyticsError::invalid(
                "monte_carlo_simulations",
                "must be >= 1",
            ));
        }
        let t = self.regime_thresholds;
        if !(t.low > 0.0 && t.low < t.medium && t.medium < t.high) {
            return Err(AnalyticsError::invalid(
                "regime_thresholds",
                "need 0 < low < medium < high",
            ));
        }
        Ok(())
    }
}

// ─── Anomaly ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Expected anomaly fraction for threshold-by-quantile strategies.
    pub contamination: f64,
    /// Registered strategy names to run.
    pub strategies: Vec<String>,
    pub voting: VotingRule,
    /// Per-strategy weights for weighted voting (missing → 1.0).
    pub weights: BTreeMap<String, f64>,
    /// Weighted-vote threshold as a fraction of the total weight.
    pub weighted_threshold: f64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub lof_neighbors: usize,
    /// DBSCAN radius in standardized feature space; `None` picks it from the
    /// k-distance distribution.
    pub dbscan_eps: Option<f64>,
    pub dbscan_min_points: usize,
    /// Rolling window for volume ratio and z-score features.
    pub feature_window: usize,
    pub price_z_threshold: f64,
    pub volume_multiple: f64,
    pub pattern_window: usize,
    pub pattern_history: usize,
    pub pattern_z_threshold: f64,
    pub seed: u64,
    /// Minimum number of feature rows before strategies run.
    pub min_observations: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            strategies: registry::DEFAULT_STRATEGIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            voting: VotingRule::Majority,
            weights: BTreeMap::new(),
            weighted_threshold: 0.5,
            n_estimators: 100,
            max_samples: 256,
            lof_neighbors: 20,
            dbscan_eps: None,
            dbscan_min_points: 5,
            feature_window: 20,
            price_z_threshold: 3.0,
            volume_multiple: 3.0,
            pattern_window: 10,
            pattern_history: 50,
            pattern_z_threshold: 3.0,
            seed: 42,
            min_observations: 30,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(AnalyticsError::invalid("contamination", "must be in (0, 0.5]"));
        }
        if self.strategies.is_empty() {
            return Err(AnalyticsError::invalid(
                "strategies",
                "at least one strategy is required",
            ));
        }
        for name in &self.strategies {
            if !registry::is_registered(name) {
                return Err(AnalyticsError::invalid(
                    "strategies",
                    format!("unknown strategy '{name}'"),
                ));
            }
        }
        if self.weights.values().any(|w| !(*w >= 0.0)) {
            return Err(AnalyticsError::invalid("weights", "must be non-negative"));
        }
        if !(self.weighted_threshold > 0.0 && self.weighted_threshold <= 1.0) {
            return Err(AnalyticsError::invalid(
                "weighted_threshold",
                "must be in (0, 1]",
            ));
        }
        require_period("n_estimators", self.n_estimators)?;
        if self.max_samples < 2 {
            return Err(AnalyticsError::invalid("max_samples", "must be >= 2"));
        }
        require_period("lof_neighbors", self.lof_neighbors)?;
        require_period("dbscan_min_points", self.dbscan_min_points)?;
        if let Some(eps) = self.dbscan_eps {
            if !(eps > 0.0) {
                return Err(AnalyticsError::invalid("dbscan_eps", "must be positive"));
            }
        }
        if self.feature_window < 2 {
            return Err(AnalyticsError::invalid("feature_window", "must be >= 2"));
        }
        if self.pattern_window < 2 {
            return Err(AnalyticsError::invalid("pattern_window", "must be >= 2"));
        }
        require_period("pattern_history", self.pattern_history)?;
        for (name, v) in [
            ("price_z_threshold", self.price_z_threshold),
            ("volume_multiple", self.volume_multiple),
            ("pattern_z_threshold", self.pattern_z_threshold),
        ] {
            if !(v > 0.0) {
                return Err(AnalyticsError::invalid(name, "must be positive"));
            }
        }
        if self.min_observations < 2 {
            return Err(AnalyticsError::invalid("min_observations", "must be >= 2"));
        }
        Ok(())
    }

    pub fn weight_for(&self, strategy: &str) -> f64 {
        self.weights.get(strategy).copied().unwrap_or(1.0)
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request compute budget in milliseconds.
    pub compute_budget_ms: u64,
    pub indicator_ttl_secs: u64,
    pub correlation_ttl_secs: u64,
    pub risk_ttl_secs: u64,
    pub anomaly_ttl_secs: u64,
    /// Default history requested from the data provider.
    pub lookback_days: i64,
    pub interval: Interval,
    /// Worker threads for the engine's private pool (0 = one per core).
    pub worker_threads: usize,
    /// Benchmark symbol for beta, if any.
    pub benchmark: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compute_budget_ms: 30_000,
            indicator_ttl_secs: 3_600,
            correlation_ttl_secs: 7_200,
            risk_ttl_secs: 14_400,
            anomaly_ttl_secs: 1_800,
            lookback_days: 365,
            interval: Interval::Day1,
            worker_threads: 0,
            benchmark: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.compute_budget_ms == 0 {
            return Err(AnalyticsError::invalid("compute_budget_ms", "must be > 0"));
        }
        if self.lookback_days <= 0 {
            return Err(AnalyticsError::invalid("lookback_days", "must be > 0"));
        }
        Ok(())
    }
}
