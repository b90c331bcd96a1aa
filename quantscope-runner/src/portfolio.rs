//! Portfolio aggregation: weights, component VaR and shock scenarios.
//!
//! Component VaR uses the parametric (zero-mean normal) decomposition
//!
//! ```text
//! marginal_i  = z · cov(r_i, r_p) / σ_p
//! component_i = w_i · marginal_i
//! ```
//!
//! so the components sum exactly to the portfolio VaR `z · σ_p`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use quantscope_core::data::align_inner;
use quantscope_core::error::require_confidence;
use quantscope_core::risk::historical_var;
use quantscope_core::stats::{covariance, normal_ppf, sample_std, sample_variance, VARIANCE_EPSILON};
use quantscope_core::{AnalyticsError, PriceSeries};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRiskContribution {
    pub symbol: String,
    pub weight: f64,
    /// Per-period return volatility of the asset alone.
    pub volatility: f64,
    pub marginal_var: f64,
    pub component_var: f64,
    /// Share of the portfolio VaR; 0 when the portfolio VaR is 0.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRisk {
    pub confidence: f64,
    pub observations: usize,
    /// Normalized weights, summing to 1.
    pub weights: BTreeMap<String, f64>,
    /// Per-period volatility of the weighted return series.
    pub volatility: f64,
    /// Parametric VaR, `z · σ_p`. Positive loss magnitude.
    pub parametric_var: f64,
    /// Historical-simulation VaR of the weighted return series.
    pub historical_var: f64,
    pub historical_cvar: f64,
    /// Weighted mean asset volatility over portfolio volatility; `None`
    /// for a flat portfolio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diversification_ratio: Option<f64>,
    pub components: Vec<AssetRiskContribution>,
}

impl PortfolioRisk {
    pub fn component(&self, symbol: &str) -> Option<&AssetRiskContribution> {
        self.components.iter().find(|c| c.symbol == symbol)
    }
}

/// Effect of one scenario shock on a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetImpact {
    pub symbol: String,
    pub original_value: f64,
    pub shocked_value: f64,
    /// `shocked_value - original_value`; negative for a loss.
    pub impact: f64,
    /// Fractional shock applied, 0 for unshocked positions.
    pub shock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub original_value: f64,
    pub stressed_value: f64,
    pub total_impact: f64,
    /// `total_impact / original_value`; 0 for an empty book.
    pub impact_percentage: f64,
    pub impacts: Vec<AssetImpact>,
    pub shocks: BTreeMap<String, f64>,
}

impl StressTestResult {
    pub fn impact(&self, symbol: &str) -> Option<&AssetImpact> {
        self.impacts.iter().find(|i| i.symbol == symbol)
    }
}

/// Normalize `weights` over `symbols`, or weight every symbol equally.
///
/// Symbols missing from `weights` get zero; weights for symbols outside the
/// portfolio, negative or non-finite weights, and an all-zero set are
/// rejected.
pub fn resolve_weights(
    symbols: &[String],
    weights: Option<&BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, f64>, AnalyticsError> {
    if symbols.is_empty() {
        return Err(AnalyticsError::invalid("symbols", "portfolio is empty"));
    }
    let Some(weights) = weights else {
        let w = 1.0 / symbols.len() as f64;
        return Ok(symbols.iter().map(|s| (s.clone(), w)).collect());
    };

    for (symbol, w) in weights {
        if !symbols.contains(symbol) {
            return Err(AnalyticsError::invalid(
                "weights",
                format!("'{symbol}' is not in the portfolio"),
            ));
        }
        if !(w.is_finite() && *w >= 0.0) {
            return Err(AnalyticsError::invalid(
                "weights",
                format!("weight for '{symbol}' must be a non-negative number, got {w}"),
            ));
        }
    }
    let total: f64 = weights.values().sum();
    if !(total > 0.0) {
        return Err(AnalyticsError::invalid("weights", "weights sum to zero"));
    }
    Ok(symbols
        .iter()
        .map(|s| (s.clone(), weights.get(s).copied().unwrap_or(0.0) / total))
        .collect())
}

/// Component VaR of a weighted portfolio on the assets' common timeline.
pub fn component_var(
    series: &[PriceSeries],
    weights: &BTreeMap<String, f64>,
    confidence: f64,
    min_observations: usize,
) -> Result<PortfolioRisk, AnalyticsError> {
    require_confidence(confidence)?;
    let refs: Vec<&PriceSeries> = series.iter().collect();
    let panel = align_inner(&refs);
    let columns = panel.returns();
    let observations = columns.first().map(Vec::len).unwrap_or(0);
    if observations < min_observations.max(2) {
        return Err(AnalyticsError::insufficient(
            "portfolio component VaR",
            min_observations.max(2),
            observations,
        ));
    }

    let w: Vec<f64> = panel
        .symbols
        .iter()
        .map(|s| weights.get(s).copied().unwrap_or(0.0))
        .collect();
    let portfolio: Vec<f64> = (0..observations)
        .map(|t| columns.iter().zip(&w).map(|(col, wi)| wi * col[t]).sum())
        .collect();
    if portfolio.iter().any(|r| !r.is_finite()) {
        return Err(AnalyticsError::component(
            "portfolio",
            "non-finite returns on the common timeline",
        ));
    }

    let z = normal_ppf(confidence);
    let variance = sample_variance(&portfolio);
    let flat = variance < VARIANCE_EPSILON;
    let sigma_p = if flat { 0.0 } else { variance.sqrt() };
    let parametric = z * sigma_p;
    let historical = historical_var(&portfolio, confidence)?;

    let mut weighted_vol = 0.0;
    let components: Vec<AssetRiskContribution> = panel
        .symbols
        .iter()
        .zip(&columns)
        .zip(&w)
        .map(|((symbol, col), &weight)| {
            let volatility = sample_std(col);
            weighted_vol += weight * volatility;
            let marginal = if flat {
                0.0
            } else {
                z * covariance(col, &portfolio) / sigma_p
            };
            let component = weight * marginal;
            AssetRiskContribution {
                symbol: symbol.clone(),
                weight,
                volatility,
                marginal_var: marginal,
                component_var: component,
                contribution: if parametric > 0.0 {
                    component / parametric
                } else {
                    0.0
                },
            }
        })
        .collect();

    Ok(PortfolioRisk {
        confidence,
        observations,
        weights: weights.clone(),
        volatility: sigma_p,
        parametric_var: parametric,
        historical_var: historical.var,
        historical_cvar: historical.cvar,
        diversification_ratio: (!flat).then(|| weighted_vol / sigma_p),
        components,
    })
}

/// Apply fractional price `shocks` (e.g. `-0.2` for a 20% drop) to a book of
/// `portfolio_value` split by `weights`. Unshocked positions keep their value.
///
/// Shocks must be finite, no lower than `-1` and name a held symbol.
pub fn stress_test(
    weights: &BTreeMap<String, f64>,
    shocks: &BTreeMap<String, f64>,
    portfolio_value: f64,
) -> Result<StressTestResult, AnalyticsError> {
    if !(portfolio_value.is_finite() && portfolio_value >= 0.0) {
        return Err(AnalyticsError::invalid(
            "portfolio_value",
            format!("must be a non-negative number, got {portfolio_value}"),
        ));
    }
    for (symbol, shock) in shocks {
        if !weights.contains_key(symbol) {
            return Err(AnalyticsError::invalid(
                "shocks",
                format!("'{symbol}' is not in the portfolio"),
            ));
        }
        if !(shock.is_finite() && *shock >= -1.0) {
            return Err(AnalyticsError::invalid(
                "shocks",
                format!("shock for '{symbol}' must be a number of at least -1, got {shock}"),
            ));
        }
    }

    let impacts: Vec<AssetImpact> = weights
        .iter()
        .map(|(symbol, w)| {
            let shock = shocks.get(symbol).copied().unwrap_or(0.0);
            let original_value = w * portfolio_value;
            let shocked_value = original_value * (1.0 + shock);
            AssetImpact {
                symbol: symbol.clone(),
                original_value,
                shocked_value,
                impact: shocked_value - original_value,
                shock,
            }
        })
        .collect();
    let original_value: f64 = impacts.iter().map(|i| i.original_value).sum();
    let stressed_value: f64 = impacts.iter().map(|i| i.shocked_value).sum();
    let total_impact = stressed_value - original_value;

    Ok(StressTestResult {
        original_value,
        stressed_value,
        total_impact,
        impact_percentage: if original_value > 0.0 {
            total_impact / original_value
        } else {
            0.0
        },
        impacts,
        shocks: shocks.clone(),
    })
}
