//! Rule-based detectors on the raw series: extreme returns, volume spikes,
//! and unusual price shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::Deadline;
use crate::config::AnomalyConfig;
use crate::domain::PriceSeries;
use crate::error::AnalyticsError;
use crate::stats::{mean, rolling_zscore, sample_std, VARIANCE_EPSILON};

use super::features::volume_ratio;
use super::neighbors::euclidean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Price,
    Volume,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: AnomalyKind,
    /// Return z-score, volume multiple, or shape-distance z-score.
    pub score: f64,
}

/// Bars whose log-return z-score (against the preceding `window` returns)
/// exceeds `threshold` in magnitude.
pub fn price_anomalies(series: &PriceSeries, window: usize, threshold: f64) -> Vec<AnomalyEvent> {
    let mut returns = vec![f64::NAN];
    returns.extend(series.log_returns());
    let z = rolling_zscore(&returns, window);
    events(series, AnomalyKind::Price, &z, |v| v.abs() > threshold)
}

/// Bars whose volume exceeds `multiple` times the mean of the preceding
/// `window` volumes. A zero mean never flags.
pub fn volume_anomalies(series: &PriceSeries, window: usize, multiple: f64) -> Vec<AnomalyEvent> {
    let ratio = volume_ratio(&series.volumes(), window);
    events(series, AnomalyKind::Volume, &ratio, |v| v > multiple)
}

/// Shape anomalies.
///
/// Each `pattern_window`-bar close window is z-normalized and compared with
/// the windows of the preceding `pattern_history` bars that do not overlap
/// it; the distance to the closest one is the window's novelty. A bar is
/// flagged when that novelty is more than `pattern_z_threshold` deviations
/// above the novelty of the previous `pattern_history` bars.
pub fn pattern_anomalies(
    series: &PriceSeries,
    config: &AnomalyConfig,
    deadline: &Deadline,
) -> Result<Vec<AnomalyEvent>, AnalyticsError> {
    let novelty = shape_novelty(
        &series.closes(),
        config.pattern_window,
        config.pattern_history,
        deadline,
    )?;
    let z = rolling_zscore(&novelty, config.pattern_history.max(2));
    Ok(events(series, AnomalyKind::Pattern, &z, |v| {
        v > config.pattern_z_threshold
    }))
}

/// Nearest-neighbour distance of each z-normalized window to the earlier,
/// non-overlapping windows within `history` bars. NaN where no comparison
/// window exists.
pub fn shape_novelty(
    closes: &[f64],
    window: usize,
    history: usize,
    deadline: &Deadline,
) -> Result<Vec<f64>, AnalyticsError> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 || n < 2 * window {
        return Ok(out);
    }
    let shapes: Vec<Option<Vec<f64>>> = (0..n)
        .map(|end| {
            if end + 1 < window {
                return None;
            }
            z_normalize(&closes[end + 1 - window..=end])
        })
        .collect();

    for t in (2 * window - 1)..n {
        if t % 256 == 0 {
            deadline.check("pattern anomalies")?;
        }
        let Some(current) = &shapes[t] else { continue };
        let first = t.saturating_sub(history).max(window - 1);
        let last = t - window;
        out[t] = (first..=last)
            .filter_map(|j| shapes[j].as_ref().map(|s| euclidean(current, s)))
            .fold(f64::NAN, f64::min);
    }
    Ok(out)
}

/// Zero mean, unit deviation. A flat window maps to all zeros; a window
/// with NaN has no shape.
fn z_normalize(window: &[f64]) -> Option<Vec<f64>> {
    if window.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let m = mean(window);
    let sd = sample_std(window);
    if sd * sd < VARIANCE_EPSILON {
        return Some(vec![0.0; window.len()]);
    }
    Some(window.iter().map(|v| (v - m) / sd).collect())
}

fn events(
    series: &PriceSeries,
    kind: AnomalyKind,
    values: &[f64],
    flag: impl Fn(f64) -> bool,
) -> Vec<AnomalyEvent> {
    series
        .bars()
        .iter()
        .zip(values)
        .enumerate()
        .filter(|(_, (_, v))| v.is_finite() && flag(**v))
        .map(|(index, (bar, v))| AnomalyEvent {
            index,
            timestamp: bar.timestamp,
            kind,
            score: *v,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() + 0.05 * ((i * 13) % 7) as f64)
            .collect()
    }

    #[test]
    fn price_jump_is_flagged() {
        let mut closes = wavy(80);
        closes[60] *= 1.25;
        let s = PriceSeries::from_closes("X", &closes);
        let ev = price_anomalies(&s, 20, 3.0);
        assert!(ev.iter().any(|e| e.index == 60 && e.score > 3.0));
        assert!(ev.iter().all(|e| e.kind == AnomalyKind::Price));
    }

    #[test]
    fn constant_price_has_no_price_anomaly() {
        let s = PriceSeries::from_closes("X", &[42.0; 50]);
        assert!(price_anomalies(&s, 10, 3.0).is_empty());
    }

    #[test]
    fn volume_spike_is_flagged() {
        let base = PriceSeries::from_closes("X", &wavy(40));
        let mut bars = base.bars().to_vec();
        bars[30].volume = 10_000.0;
        let s = PriceSeries::new("X", Interval::Day1, bars).unwrap();
        let ev = volume_anomalies(&s, 10, 3.0);
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].index, 30);
        assert!((ev[0].score - 10.0).abs() < 1e-12);
    }

    #[test]
    fn zero_volume_has_no_volume_anomaly() {
        let base = PriceSeries::from_closes("X", &wavy(40));
        let bars = base
            .bars()
            .iter()
            .map(|b| crate::domain::Bar {
                volume: 0.0,
                ..b.clone()
            })
            .collect();
        let s = PriceSeries::new("X", Interval::Day1, bars).unwrap();
        assert!(volume_anomalies(&s, 10, 3.0).is_empty());
    }

    #[test]
    fn novelty_of_repeating_pattern_is_zero() {
        let period = [1.0, 2.0, 3.0, 2.0];
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + period[i % 4]).collect();
        let nov = shape_novelty(&closes, 4, 20, &Deadline::unbounded()).unwrap();
        assert!(nov[..7].iter().all(|v| v.is_nan()));
        assert!(nov[7..].iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn broken_pattern_is_flagged() {
        let period = [1.0, 2.0, 3.0, 2.0];
        let mut closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + period[i % 4] + 0.05 * (i as f64 * 1.37).sin())
            .collect();
        closes[100] = 90.0;
        let s = PriceSeries::from_closes("X", &closes);
        let config = AnomalyConfig {
            pattern_window: 4,
            pattern_history: 30,
            ..AnomalyConfig::default()
        };
        let ev = pattern_anomalies(&s, &config, &Deadline::unbounded()).unwrap();
        assert!(ev.iter().any(|e| e.index == 100), "{ev:?}");
    }

    #[test]
    fn flat_series_has_no_pattern_anomaly() {
        let s = PriceSeries::from_closes("X", &[10.0; 100]);
        let ev = pattern_anomalies(&s, &AnomalyConfig::default(), &Deadline::unbounded()).unwrap();
        assert!(ev.is_empty());
    }
}
