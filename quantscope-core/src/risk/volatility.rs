//! Volatility estimators.
//!
//! Every estimator returns an annualized standard deviation: the per-period
//! figure scaled by √periods_per_year.

use serde::{Deserialize, Serialize};

use crate::config::VolatilityThresholds;
use crate::domain::Bar;
use crate::error::AnalyticsError;
use crate::stats::{mean, sample_std, sample_variance};

/// GARCH(1,1) reaction to the latest squared shock.
pub const GARCH_ALPHA: f64 = 0.1;
/// GARCH(1,1) persistence of the previous conditional variance.
pub const GARCH_BETA: f64 = 0.85;

/// Returns used to seed the EWMA recursion.
const EWMA_SEED_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Medium,
    High,
    Extreme,
}

impl VolatilityRegime {
    pub fn classify(annualized: f64, thresholds: &VolatilityThresholds) -> Self {
        if annualized < thresholds.low {
            VolatilityRegime::Low
        } else if annualized < thresholds.medium {
            VolatilityRegime::Medium
        } else if annualized < thresholds.high {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityRegime::Low => "low",
            VolatilityRegime::Medium => "medium",
            VolatilityRegime::High => "high",
            VolatilityRegime::Extreme => "extreme",
        }
    }
}

// ─── Close-to-close ──────────────────────────────────────────────────

/// Sample deviation of the last `window` returns (all of them if fewer),
/// annualized.
pub fn historical_volatility(returns: &[f64], window: usize, periods_per_year: f64) -> f64 {
    let start = returns.len().saturating_sub(window);
    sample_std(&returns[start..]) * periods_per_year.sqrt()
}

/// Annualized rolling volatility, NaN until `window` returns exist.
pub fn rolling_volatility(returns: &[f64], window: usize, periods_per_year: f64) -> Vec<f64> {
    let n = returns.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return out;
    }
    let scale = periods_per_year.sqrt();
    for i in (window - 1)..n {
        let w = &returns[i + 1 - window..=i];
        if w.iter().any(|r| r.is_nan()) {
            continue;
        }
        out[i] = sample_std(w) * scale;
    }
    out
}

// ─── Range-based ─────────────────────────────────────────────────────

/// Parkinson estimator over the last `window` bars:
/// σ² = Σ ln(H/L)² / (4 ln 2 · n).
pub fn parkinson_volatility(
    bars: &[Bar],
    window: usize,
    periods_per_year: f64,
) -> Result<f64, AnalyticsError> {
    let bars = trailing(bars, window, "parkinson volatility")?;
    let mut sum = 0.0;
    for bar in bars {
        let hl = range_log(bar).ok_or_else(|| missing_fields("parkinson volatility"))?;
        sum += hl * hl;
    }
    let variance = sum / (4.0 * std::f64::consts::LN_2 * bars.len() as f64);
    Ok(variance.sqrt() * periods_per_year.sqrt())
}

/// Garman-Klass estimator over the last `window` bars:
/// σ² = mean(½ ln(H/L)² − (2 ln 2 − 1) ln(C/O)²), floored at zero.
pub fn garman_klass_volatility(
    bars: &[Bar],
    window: usize,
    periods_per_year: f64,
) -> Result<f64, AnalyticsError> {
    let bars = trailing(bars, window, "garman-klass volatility")?;
    let k = 2.0 * std::f64::consts::LN_2 - 1.0;
    let mut sum = 0.0;
    for bar in bars {
        let hl = range_log(bar).ok_or_else(|| missing_fields("garman-klass volatility"))?;
        let co = body_log(bar).ok_or_else(|| missing_fields("garman-klass volatility"))?;
        sum += 0.5 * hl * hl - k * co * co;
    }
    let variance = (sum / bars.len() as f64).max(0.0);
    Ok(variance.sqrt() * periods_per_year.sqrt())
}

fn trailing<'a>(bars: &'a [Bar], window: usize, context: &str) -> Result<&'a [Bar], AnalyticsError> {
    if bars.is_empty() {
        return Err(AnalyticsError::insufficient(context, window.max(1), 0));
    }
    Ok(&bars[bars.len().saturating_sub(window)..])
}

fn range_log(bar: &Bar) -> Option<f64> {
    (bar.high > 0.0 && bar.low > 0.0 && bar.high >= bar.low).then(|| (bar.high / bar.low).ln())
}

fn body_log(bar: &Bar) -> Option<f64> {
    (bar.open > 0.0 && bar.close > 0.0).then(|| (bar.close / bar.open).ln())
}

fn missing_fields(context: &str) -> AnalyticsError {
    AnalyticsError::InsufficientData {
        context: format!("{context} (missing or non-positive OHLC fields)"),
        required: 1,
        available: 0,
    }
}

// ─── Conditional ─────────────────────────────────────────────────────

/// EWMA variance path: `v[0]` is the seed (mean square of the first returns),
/// `v[t] = λ·v[t-1] + (1-λ)·r[t-1]²`. Length `returns.len() + 1`; the last
/// entry is the one-step-ahead forecast.
pub fn ewma_variance_path(returns: &[f64], lambda: f64) -> Vec<f64> {
    let seed_len = returns.len().min(EWMA_SEED_WINDOW);
    let seed = if seed_len == 0 {
        0.0
    } else {
        returns[..seed_len].iter().map(|r| r * r).sum::<f64>() / seed_len as f64
    };
    let mut path = Vec::with_capacity(returns.len() + 1);
    path.push(seed);
    let mut v = seed;
    for r in returns {
        v = lambda * v + (1.0 - lambda) * r * r;
        path.push(v);
    }
    path
}

/// GARCH(1,1) with fixed α, β and ω = (1 − α − β)·sample variance. Returns
/// the conditional variance path on demeaned returns, seeded at the sample
/// variance; the last entry is the one-step-ahead forecast.
pub fn garch_variance_path(returns: &[f64]) -> Vec<f64> {
    let long_run = sample_variance(returns);
    let omega = (1.0 - GARCH_ALPHA - GARCH_BETA) * long_run;
    let mu = mean(returns);
    let mut path = Vec::with_capacity(returns.len() + 1);
    let mut v = long_run;
    path.push(v);
    for r in returns {
        let shock = r - mu;
        v = omega + GARCH_ALPHA * shock * shock + GARCH_BETA * v;
        path.push(v);
    }
    path
}

/// Annualize a per-period variance.
pub fn annualize_variance(variance: f64, periods_per_year: f64) -> f64 {
    (variance.max(0.0) * periods_per_year).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSeries;

    fn thresholds() -> VolatilityThresholds {
        VolatilityThresholds::default()
    }

    #[test]
    fn classify_buckets() {
        let t = thresholds();
        assert_eq!(VolatilityRegime::classify(0.10, &t), VolatilityRegime::Low);
        assert_eq!(VolatilityRegime::classify(0.15, &t), VolatilityRegime::Medium);
        assert_eq!(VolatilityRegime::classify(0.30, &t), VolatilityRegime::High);
        assert_eq!(VolatilityRegime::classify(0.40, &t), VolatilityRegime::Extreme);
    }

    #[test]
    fn historical_uses_trailing_window() {
        let mut r = vec![0.05, -0.05, 0.05, -0.05];
        r.extend(std::iter::repeat(0.0).take(10));
        assert_eq!(historical_volatility(&r, 10, 252.0), 0.0);
        assert!(historical_volatility(&r, 14, 252.0) > 0.0);
    }

    #[test]
    fn historical_annualizes_by_sqrt_periods() {
        let r = [0.01, -0.01, 0.01, -0.01];
        let daily = sample_std(&r);
        let annual = historical_volatility(&r, 252, 252.0);
        assert!((annual - daily * 252f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rolling_warmup_is_nan() {
        let r = [0.01, -0.02, 0.03, 0.0, 0.01];
        let v = rolling_volatility(&r, 3, 252.0);
        assert!(v[0].is_nan() && v[1].is_nan());
        assert!(v[2] > 0.0);
        assert_eq!(v.len(), r.len());
    }

    #[test]
    fn parkinson_constant_range() {
        // ln(H/L) fixed at ln(1.02) on every bar
        let closes: Vec<f64> = (0..20).map(|_| 100.0).collect();
        let s = PriceSeries::from_closes("X", &closes);
        let bars: Vec<Bar> = s
            .bars()
            .iter()
            .map(|b| Bar { high: 101.0, low: 101.0 / 1.02, ..b.clone() })
            .collect();
        let vol = parkinson_volatility(&bars, 20, 1.0).unwrap();
        let expected = (1.02f64.ln().powi(2) / (4.0 * std::f64::consts::LN_2)).sqrt();
        assert!((vol - expected).abs() < 1e-12);
    }

    #[test]
    fn range_estimators_reject_nan_fields() {
        let s = PriceSeries::from_closes("X", &[100.0, 101.0, 102.0]);
        let mut bars = s.bars().to_vec();
        bars[1].high = f64::NAN;
        let err = parkinson_volatility(&bars, 10, 252.0).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
        let err = garman_klass_volatility(&bars, 10, 252.0).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn garman_klass_is_non_negative() {
        let s = PriceSeries::from_closes("X", &[100.0, 104.0, 99.0, 103.0, 101.0]);
        let vol = garman_klass_volatility(s.bars(), 5, 252.0).unwrap();
        assert!(vol >= 0.0 && vol.is_finite());
    }

    #[test]
    fn ewma_recursion() {
        let r = [0.02, -0.01];
        let path = ewma_variance_path(&r, 0.94);
        let seed = (0.0004 + 0.0001) / 2.0;
        assert!((path[0] - seed).abs() < 1e-15);
        let v1 = 0.94 * seed + 0.06 * 0.0004;
        assert!((path[1] - v1).abs() < 1e-15);
        let v2 = 0.94 * v1 + 0.06 * 0.0001;
        assert!((path[2] - v2).abs() < 1e-15);
    }

    #[test]
    fn garch_reverts_to_long_run_variance() {
        // after a burst of identical shocks the path decays toward the sample variance
        let mut r = vec![0.0; 200];
        for (i, v) in r.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 0.01 } else { -0.01 };
        }
        let path = garch_variance_path(&r);
        let long_run = sample_variance(&r);
        let last = *path.last().unwrap();
        assert!((last - long_run).abs() / long_run < 0.05, "{last} vs {long_run}");
    }

    #[test]
    fn flat_returns_have_zero_volatility() {
        let r = vec![0.0; 40];
        assert_eq!(historical_volatility(&r, 252, 252.0), 0.0);
        assert!(ewma_variance_path(&r, 0.94).iter().all(|v| *v == 0.0));
        assert!(garch_variance_path(&r).iter().all(|v| *v == 0.0));
    }
}
