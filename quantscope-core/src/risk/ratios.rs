//! Risk-adjusted return ratios and return-distribution shape.

use crate::stats::{covariance, mean, population_std, sample_std, sample_variance, VARIANCE_EPSILON};

/// Annualized Sharpe ratio.
///
/// Sharpe = mean(r - rf) / std(r - rf) * sqrt(periods_per_year), where rf is
/// the annual risk-free rate spread evenly over the periods. `None` for fewer
/// than two returns or zero deviation.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let excess = excess_returns(returns, risk_free_rate, periods_per_year);
    let sd = sample_std(&excess);
    if sd * sd < VARIANCE_EPSILON {
        return None;
    }
    Some(mean(&excess) / sd * periods_per_year.sqrt())
}

/// Annualized Sortino ratio.
///
/// Downside deviation = sqrt(Σ min(r - rf, 0)² / n) over all n returns.
/// `None` when no period fell below the risk-free rate.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let excess = excess_returns(returns, risk_free_rate, periods_per_year);
    let downside_var =
        excess.iter().filter(|r| **r < 0.0).map(|r| r * r).sum::<f64>() / excess.len() as f64;
    if downside_var < VARIANCE_EPSILON {
        return None;
    }
    Some(mean(&excess) / downside_var.sqrt() * periods_per_year.sqrt())
}

/// Beta = cov(asset, benchmark) / var(benchmark) over aligned returns.
pub fn beta(asset: &[f64], benchmark: &[f64]) -> Option<f64> {
    let n = asset.len().min(benchmark.len());
    if n < 2 {
        return None;
    }
    let var_b = sample_variance(&benchmark[..n]);
    if var_b < VARIANCE_EPSILON {
        return None;
    }
    Some(covariance(&asset[..n], &benchmark[..n]) / var_b)
}

/// Third standardized moment. 0.0 for a flat sample.
pub fn skewness(returns: &[f64]) -> f64 {
    standardized_moment(returns, 3)
}

/// Fourth standardized moment minus 3 (0 for a normal distribution).
pub fn excess_kurtosis(returns: &[f64]) -> f64 {
    if returns.is_empty() || population_std(returns).powi(2) < VARIANCE_EPSILON {
        return 0.0;
    }
    standardized_moment(returns, 4) - 3.0
}

fn standardized_moment(returns: &[f64], k: i32) -> f64 {
    let sd = population_std(returns);
    if returns.is_empty() || sd * sd < VARIANCE_EPSILON {
        return 0.0;
    }
    let m = mean(returns);
    returns.iter().map(|r| ((r - m) / sd).powi(k)).sum::<f64>() / returns.len() as f64
}

fn excess_returns(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Vec<f64> {
    let rf = risk_free_rate / periods_per_year;
    returns.iter().map(|r| r - rf).collect()
}
