//! Feature engineering for anomaly detection.
//!
//! One row per bar. Rows inside the warm-up carry NaN and are left out of
//! model fitting; the detector reports them as "no anomaly".

use crate::domain::PriceSeries;
use crate::stats::{mean, rolling_zscore, sample_std, VARIANCE_EPSILON};

pub const LOG_RETURN: &str = "log_return";
pub const VOLUME_RATIO: &str = "volume_ratio";
pub const SPREAD: &str = "spread";
pub const RETURN_ZSCORE: &str = "return_zscore";
pub const VOLUME_ZSCORE: &str = "volume_zscore";
pub const RANGE_RATIO: &str = "range_ratio";

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build the feature set with a rolling `window` for ratios and z-scores.
    ///
    /// The spread column is included only when every bar carries a quote.
    pub fn build(series: &PriceSeries, window: usize) -> Self {
        let bars = series.bars();
        let n = bars.len();

        let mut returns = vec![f64::NAN; n];
        for i in 1..n {
            let (prev, cur) = (bars[i - 1].close, bars[i].close);
            if prev > 0.0 && cur > 0.0 {
                returns[i] = (cur / prev).ln();
            }
        }
        let volumes = series.volumes();

        let mut columns: Vec<(&str, Vec<f64>)> = vec![
            (LOG_RETURN, returns.clone()),
            (VOLUME_RATIO, volume_ratio(&volumes, window)),
        ];
        if n > 0 && bars.iter().all(|b| b.relative_spread().is_some()) {
            let spread = bars
                .iter()
                .map(|b| b.relative_spread().unwrap_or(f64::NAN))
                .collect();
            columns.push((SPREAD, spread));
        }
        columns.push((RETURN_ZSCORE, rolling_zscore(&returns, window)));
        columns.push((VOLUME_ZSCORE, rolling_zscore(&volumes, window)));
        columns.push((
            RANGE_RATIO,
            bars.iter()
                .map(|b| {
                    if b.close > 0.0 {
                        (b.high - b.low) / b.close
                    } else {
                        f64::NAN
                    }
                })
                .collect(),
        ));

        let names = columns.iter().map(|(name, _)| name.to_string()).collect();
        let rows = (0..n)
            .map(|i| columns.iter().map(|(_, col)| col[i]).collect())
            .collect();
        Self { names, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Indices of rows whose every feature is finite.
    pub fn valid_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.iter().all(|v| v.is_finite()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Column-standardized copies of the selected rows. A column with no
    /// variation becomes all zeros.
    pub fn standardized(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        let width = self.width();
        let mut params = Vec::with_capacity(width);
        for j in 0..width {
            let col: Vec<f64> = indices.iter().map(|&i| self.rows[i][j]).collect();
            let sd = sample_std(&col);
            params.push((mean(&col), sd));
        }
        indices
            .iter()
            .map(|&i| {
                self.rows[i]
                    .iter()
                    .zip(&params)
                    .map(|(v, (m, sd))| {
                        if sd * sd < VARIANCE_EPSILON {
                            0.0
                        } else {
                            (v - m) / sd
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Volume over the mean of the preceding `window` volumes. A zero or
/// negative mean yields 1.0 (no deviation).
pub fn volume_ratio(volumes: &[f64], window: usize) -> Vec<f64> {
    let n = volumes.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 {
        return out;
    }
    for i in window..n {
        let m = mean(&volumes[i - window..i]);
        out[i] = if m > 0.0 { volumes[i] / m } else { 1.0 };
    }
    out
}
