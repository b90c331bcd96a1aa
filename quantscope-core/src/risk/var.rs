//! Value at Risk and Conditional VaR.
//!
//! All figures are positive loss magnitudes in return units: a VaR of 0.02
//! at 95% means a 5% chance of losing more than 2% over one period. A
//! distribution with no loss tail reports 0, never a negative VaR.
//!
//! - Parametric: normal fit, VaR = zσ − μ, CVaR = σφ(z)/α − μ.
//! - Historical: empirical quantile, CVaR = mean of returns at or below it.
//! - Monte Carlo: historical method applied to a seeded normal sample; all
//!   levels share one sample.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{require_confidence, AnalyticsError};
use crate::rng::standard_normal;
use crate::stats::{mean, normal_pdf, normal_ppf, quantile_sorted, sample_std};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Parametric,
    Historical,
    MonteCarlo,
}

impl VarMethod {
    pub const ALL: [VarMethod; 3] = [
        VarMethod::Parametric,
        VarMethod::Historical,
        VarMethod::MonteCarlo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VarMethod::Parametric => "parametric",
            VarMethod::Historical => "historical",
            VarMethod::MonteCarlo => "monte_carlo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    pub confidence: f64,
    pub method: VarMethod,
    pub var: f64,
    pub cvar: f64,
}

pub fn parametric_var(returns: &[f64], confidence: f64) -> Result<VarEstimate, AnalyticsError> {
    require_confidence(confidence)?;
    let mu = mean(returns);
    let sigma = sample_std(returns);
    let alpha = 1.0 - confidence;
    let z = normal_ppf(confidence);
    let var = (z * sigma - mu).max(0.0);
    let cvar = (sigma * normal_pdf(z) / alpha - mu).max(var);
    Ok(VarEstimate {
        confidence,
        method: VarMethod::Parametric,
        var,
        cvar,
    })
}

pub fn historical_var(returns: &[f64], confidence: f64) -> Result<VarEstimate, AnalyticsError> {
    require_confidence(confidence)?;
    let mut sorted: Vec<f64> = returns.iter().copied().filter(|r| !r.is_nan()).collect();
    if sorted.is_empty() {
        return Err(AnalyticsError::insufficient("historical VaR", 1, 0));
    }
    sorted.sort_by(f64::total_cmp);
    Ok(var_from_sorted(&sorted, confidence, VarMethod::Historical))
}

/// Simulate `simulations` normal returns fitted to `returns` and read every
/// level off the same sample.
pub fn monte_carlo_var<R: Rng + ?Sized>(
    returns: &[f64],
    confidence_levels: &[f64],
    simulations: usize,
    rng: &mut R,
) -> Result<Vec<VarEstimate>, AnalyticsError> {
    for &c in confidence_levels {
        require_confidence(c)?;
    }
    if simulations == 0 {
        return Err(AnalyticsError::invalid("monte_carlo_simulations", "must be >= 1"));
    }
    let mu = mean(returns);
    let sigma = sample_std(returns);
    let mut sample: Vec<f64> = (0..simulations)
        .map(|_| mu + sigma * standard_normal(rng))
        .collect();
    sample.sort_by(f64::total_cmp);
    Ok(confidence_levels
        .iter()
        .map(|&c| var_from_sorted(&sample, c, VarMethod::MonteCarlo))
        .collect())
}

fn var_from_sorted(sorted: &[f64], confidence: f64, method: VarMethod) -> VarEstimate {
    let cutoff = quantile_sorted(sorted, 1.0 - confidence);
    // sorted[0] <= cutoff always, so the tail is never empty
    let tail: Vec<f64> = sorted.iter().copied().take_while(|r| *r <= cutoff).collect();
    let var = (-cutoff).max(0.0);
    let cvar = (-mean(&tail)).max(var);
    VarEstimate {
        confidence,
        method,
        var,
        cvar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngHierarchy;

    fn sample_returns() -> Vec<f64> {
        let mut rng = RngHierarchy::new(3).rng_for("SPY", "returns", 0);
        (0..1000)
            .map(|_| 0.0005 + 0.012 * standard_normal(&mut rng))
            .collect()
    }

    #[test]
    fn parametric_matches_closed_form() {
        let r = [0.01, -0.01, 0.02, -0.02, 0.0];
        let est = parametric_var(&r, 0.95).unwrap();
        let sigma = sample_std(&r);
        assert!((est.var - 1.6448536269514722 * sigma).abs() < 1e-8);
        assert!(est.cvar >= est.var);
    }

    #[test]
    fn historical_known_quantile() {
        // 1..=100 as -1%..-100%: 5% quantile interpolates between the
        // fifth and sixth worst returns
        let r: Vec<f64> = (1..=100).map(|i| -(i as f64) / 100.0).collect();
        let est = historical_var(&r, 0.95).unwrap();
        let sorted_q = quantile_sorted(
            &{
                let mut s = r.clone();
                s.sort_by(f64::total_cmp);
                s
            },
            0.05,
        );
        assert!((est.var + sorted_q).abs() < 1e-12);
        assert!(est.cvar > est.var);
    }

    #[test]
    fn ordering_holds_for_every_method() {
        let r = sample_returns();
        let mut rng = RngHierarchy::new(42).rng_for("SPY", "monte_carlo_var", 0);
        let mc = monte_carlo_var(&r, &[0.95, 0.99], 10_000, &mut rng).unwrap();
        let pairs = [
            (parametric_var(&r, 0.95).unwrap(), parametric_var(&r, 0.99).unwrap()),
            (historical_var(&r, 0.95).unwrap(), historical_var(&r, 0.99).unwrap()),
            (mc[0], mc[1]),
        ];
        for (v95, v99) in pairs {
            assert!(v99.var >= v95.var, "{v95:?} {v99:?}");
            assert!(v95.cvar >= v95.var);
            assert!(v99.cvar >= v99.var);
            assert!(v95.var > 0.0);
        }
    }

    #[test]
    fn monte_carlo_is_seeded() {
        let r = sample_returns();
        let h = RngHierarchy::new(42);
        let a = monte_carlo_var(&r, &[0.99], 2000, &mut h.rng_for("SPY", "mc", 0)).unwrap();
        let b = monte_carlo_var(&r, &[0.99], 2000, &mut h.rng_for("SPY", "mc", 0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn monte_carlo_close_to_parametric() {
        let r = sample_returns();
        let mut rng = RngHierarchy::new(1).rng_for("SPY", "mc", 0);
        let mc = monte_carlo_var(&r, &[0.95], 50_000, &mut rng).unwrap()[0];
        let p = parametric_var(&r, 0.95).unwrap();
        assert!((mc.var - p.var).abs() < 0.002, "{} vs {}", mc.var, p.var);
    }

    #[test]
    fn flat_returns_have_zero_risk() {
        let r = vec![0.0; 50];
        for est in [
            parametric_var(&r, 0.99).unwrap(),
            historical_var(&r, 0.99).unwrap(),
        ] {
            assert_eq!(est.var, 0.0);
            assert_eq!(est.cvar, 0.0);
        }
    }

    #[test]
    fn all_gains_report_zero_not_negative() {
        let r = vec![0.01, 0.02, 0.015, 0.03];
        let est = historical_var(&r, 0.95).unwrap();
        assert_eq!(est.var, 0.0);
        assert_eq!(est.cvar, 0.0);
    }

    #[test]
    fn rejects_bad_confidence() {
        assert!(historical_var(&[0.01], 1.0).is_err());
        assert!(parametric_var(&[0.01], 0.0).is_err());
    }
}
