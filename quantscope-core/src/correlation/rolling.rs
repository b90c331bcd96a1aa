//! Rolling correlation and regime-change detection.
//!
//! A regime change is flagged at every point whose rolling correlation is
//! more than `regime_deviation_sigma` standard deviations (of the rolling
//! series itself) away from the full-period correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::Deadline;
use crate::config::CorrelationConfig;
use crate::error::AnalyticsError;
use crate::stats::{pearson, sample_std, VARIANCE_EPSILON};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeChange {
    /// Row index into the pair's aligned values.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub correlation: f64,
    /// Signed distance from the baseline in rolling standard deviations.
    pub deviation_sigma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingCorrelation {
    pub a: String,
    pub b: String,
    pub window: usize,
    /// Empty when the caller had no timestamps for the rows.
    #[serde(default)]
    pub timestamps: Vec<DateTime<Utc>>,
    /// One value per aligned row, NaN for warm-up and flat windows.
    #[serde(with = "crate::serde_nan::vec")]
    pub values: Vec<f64>,
    #[serde(with = "crate::serde_nan::scalar")]
    pub baseline: f64,
    pub rolling_std: f64,
    pub threshold_sigma: f64,
    pub changes: Vec<RegimeChange>,
}

/// Compact per-pair view embedded in a `CorrelationResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRegime {
    pub a: String,
    pub b: String,
    #[serde(with = "crate::serde_nan::scalar")]
    pub baseline: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<f64>,
    pub rolling_std: f64,
    pub changes: Vec<RegimeChange>,
    /// The latest rolling value is itself outside the band.
    pub in_new_regime: bool,
}

impl RollingCorrelation {
    pub fn latest(&self) -> Option<f64> {
        self.values.iter().rev().copied().find(|v| !v.is_nan())
    }

    pub fn summary(&self) -> PairRegime {
        let last_idx = self.values.iter().rposition(|v| !v.is_nan());
        let in_new_regime = match (last_idx, self.changes.last()) {
            (Some(i), Some(c)) => c.index == i,
            _ => false,
        };
        PairRegime {
            a: self.a.clone(),
            b: self.b.clone(),
            baseline: self.baseline,
            latest: self.latest(),
            rolling_std: self.rolling_std,
            changes: self.changes.clone(),
            in_new_regime,
        }
    }
}

/// Rolling Pearson over `config.rolling_window` rows of pre-aligned values.
pub(crate) fn rolling_pair(
    a: &str,
    b: &str,
    x: &[f64],
    y: &[f64],
    timestamps: Option<Vec<DateTime<Utc>>>,
    config: &CorrelationConfig,
    deadline: &Deadline,
) -> Result<RollingCorrelation, AnalyticsError> {
    let window = config.rolling_window;
    let n = x.len().min(y.len());
    let values = rolling_values(&x[..n], &y[..n], window, deadline)?;

    let baseline = pearson(&x[..n], &y[..n]).unwrap_or(f64::NAN);
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let rolling_std = sample_std(&defined);

    let timestamps = timestamps.filter(|t| t.len() == n).unwrap_or_default();
    let mut changes = Vec::new();
    if !baseline.is_nan() && rolling_std * rolling_std > VARIANCE_EPSILON {
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            let deviation_sigma = (v - baseline) / rolling_std;
            if deviation_sigma.abs() > config.regime_deviation_sigma {
                changes.push(RegimeChange {
                    index: i,
                    timestamp: timestamps.get(i).copied(),
                    correlation: v,
                    deviation_sigma,
                });
            }
        }
    }

    Ok(RollingCorrelation {
        a: a.to_string(),
        b: b.to_string(),
        window,
        timestamps,
        values,
        baseline,
        rolling_std,
        threshold_sigma: config.regime_deviation_sigma,
        changes,
    })
}

/// Rolling Pearson values, NaN for the first `window - 1` rows.
pub fn rolling_values(
    x: &[f64],
    y: &[f64],
    window: usize,
    deadline: &Deadline,
) -> Result<Vec<f64>, AnalyticsError> {
    let n = x.len().min(y.len());
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < window {
        return Ok(out);
    }
    for i in (window - 1)..n {
        if i % 256 == 0 {
            deadline.check("rolling correlation")?;
        }
        let start = i + 1 - window;
        out[i] = pearson(&x[start..=i], &y[start..=i]).unwrap_or(f64::NAN);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(window: usize, sigma: f64) -> CorrelationConfig {
        CorrelationConfig {
            rolling_window: window,
            regime_deviation_sigma: sigma,
            ..CorrelationConfig::default()
        }
    }

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 7919) % 13) as f64 - 6.0).collect()
    }

    #[test]
    fn self_correlation_is_one_everywhere() {
        let x = zigzag(80);
        let r = rolling_pair("A", "A", &x, &x, None, &cfg(10, 2.0), &Deadline::unbounded())
            .unwrap();
        for v in r.values.iter().skip(9) {
            assert!((v - 1.0).abs() < 1e-12, "{v}");
        }
        assert!(r.changes.is_empty());
    }

    #[test]
    fn decoupling_is_flagged_as_regime_change() {
        let x = zigzag(200);
        // tracks x for 170 rows, then moves against it
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| if i < 170 { *v } else { -*v })
            .collect();
        let r = rolling_pair("A", "B", &x, &y, None, &cfg(20, 2.0), &Deadline::unbounded())
            .unwrap();
        assert!(!r.changes.is_empty());
        assert!(r.changes.iter().all(|c| c.index >= 170));
        assert!(r.summary().in_new_regime);
        assert!(r.changes[0].deviation_sigma < 0.0);
    }

    #[test]
    fn warmup_is_nan() {
        let x = zigzag(30);
        let v = rolling_values(&x, &x, 10, &Deadline::unbounded()).unwrap();
        assert!(v[..9].iter().all(|v| v.is_nan()));
        assert!(!v[9].is_nan());
    }

    #[test]
    fn flat_window_is_nan_not_panic() {
        let x = vec![1.0; 30];
        let y = zigzag(30);
        let r = rolling_pair("A", "B", &x, &y, None, &cfg(10, 2.0), &Deadline::unbounded())
            .unwrap();
        assert!(r.values.iter().all(|v| v.is_nan()));
        assert!(r.baseline.is_nan());
        assert!(r.changes.is_empty());
    }
}
