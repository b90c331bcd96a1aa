//! Drawdown statistics over a price path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawdownStats {
    /// Largest peak-to-trough decline as a positive fraction (0.15 = 15%).
    pub max_drawdown: f64,
    /// Decline of the last price from its running peak.
    pub current_drawdown: f64,
    /// Index of the peak preceding the deepest trough.
    pub peak_index: usize,
    pub trough_index: usize,
    /// Longest run of bars spent below a prior peak.
    pub longest_duration: usize,
    /// Bars from the deepest trough until the prior peak was regained;
    /// `None` if it never was.
    pub recovery_bars: Option<usize>,
}

/// Maximum drawdown as a positive fraction. 0.0 for a non-decreasing path.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    drawdown_stats(prices).max_drawdown
}

pub fn drawdown_stats(prices: &[f64]) -> DrawdownStats {
    let mut stats = DrawdownStats::default();
    let Some(&first) = prices.first() else {
        return stats;
    };

    let mut peak = first;
    let mut peak_idx = 0;
    let mut underwater_since: Option<usize> = None;

    for (i, &p) in prices.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        if p >= peak {
            if let Some(start) = underwater_since.take() {
                stats.longest_duration = stats.longest_duration.max(i - start);
            }
            peak = p;
            peak_idx = i;
            continue;
        }
        underwater_since.get_or_insert(i);
        let dd = if peak > 0.0 { (peak - p) / peak } else { 0.0 };
        if dd > stats.max_drawdown {
            stats.max_drawdown = dd;
            stats.peak_index = peak_idx;
            stats.trough_index = i;
        }
    }
    if let Some(start) = underwater_since {
        stats.longest_duration = stats.longest_duration.max(prices.len() - start);
    }

    let last = prices.iter().rev().copied().find(|p| !p.is_nan()).unwrap_or(peak);
    stats.current_drawdown = if peak > 0.0 { ((peak - last) / peak).max(0.0) } else { 0.0 };

    if stats.max_drawdown > 0.0 {
        let target = prices[stats.peak_index];
        stats.recovery_bars = prices[stats.trough_index..]
            .iter()
            .position(|p| *p >= target);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_decreasing_has_zero_drawdown() {
        let s = drawdown_stats(&[100.0, 100.0, 101.0, 105.0]);
        assert_eq!(s.max_drawdown, 0.0);
        assert_eq!(s.current_drawdown, 0.0);
        assert_eq!(s.longest_duration, 0);
        assert_eq!(s.recovery_bars, None);
    }

    #[test]
    fn known_drawdown_and_recovery() {
        // peak 120 at 1, trough 90 at 3, regained at 5
        let s = drawdown_stats(&[100.0, 120.0, 100.0, 90.0, 110.0, 125.0, 120.0]);
        assert!((s.max_drawdown - 0.25).abs() < 1e-12);
        assert_eq!(s.peak_index, 1);
        assert_eq!(s.trough_index, 3);
        assert_eq!(s.recovery_bars, Some(2));
        assert_eq!(s.longest_duration, 3);
        assert!((s.current_drawdown - 0.04).abs() < 1e-12);
    }

    #[test]
    fn unrecovered_drawdown() {
        let s = drawdown_stats(&[100.0, 80.0, 85.0]);
        assert!((s.max_drawdown - 0.2).abs() < 1e-12);
        assert_eq!(s.recovery_bars, None);
        assert_eq!(s.longest_duration, 2);
        assert!((s.current_drawdown - 0.15).abs() < 1e-12);
    }

    #[test]
    fn empty_path() {
        assert_eq!(max_drawdown(&[]), 0.0);
    }
}
