//! Local outlier factor.
//!
//! LOF(p) is the mean ratio of the neighbours' local reachability density
//! to p's own. Values near 1 sit inside a cluster; larger values are
//! sparser than their neighbourhood. A point is flagged when its LOF exceeds
//! both 1.0 and the (1 − contamination) quantile.

use std::collections::BTreeMap;

use super::neighbors::Neighborhoods;
use super::{contamination_threshold, AnomalyStrategy, StrategyOutput};
use crate::budget::Deadline;
use crate::error::AnalyticsError;

/// Keeps densities finite when a point has duplicate neighbours.
const REACH_FLOOR: f64 = 1e-10;
/// LOF values within this of 1.0 are treated as inliers.
const INLIER_MARGIN: f64 = 1e-6;

pub struct LocalOutlierFactor {
    neighbors: usize,
    contamination: f64,
}

impl LocalOutlierFactor {
    pub fn new(neighbors: usize, contamination: f64) -> Self {
        Self {
            neighbors,
            contamination,
        }
    }
}

impl AnomalyStrategy for LocalOutlierFactor {
    fn name(&self) -> &str {
        "local_outlier_factor"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("neighbors".to_string(), self.neighbors as f64),
            ("contamination".to_string(), self.contamination),
        ])
    }

    fn score(&self, rows: &[Vec<f64>], deadline: &Deadline) -> Result<StrategyOutput, AnalyticsError> {
        let n = rows.len();
        if n < 3 {
            return Ok(StrategyOutput::quiet(n));
        }
        let k = self.neighbors.min(n - 1);
        let nb = Neighborhoods::build(rows, deadline)?;

        let k_dist: Vec<f64> = (0..n).map(|i| nb.k_distance(i, k)).collect();
        let lrd: Vec<f64> = (0..n)
            .map(|i| {
                let neigh = nb.nearest(i, k);
                let reach = neigh
                    .iter()
                    .map(|&o| k_dist[o].max(nb.distance(i, o)))
                    .sum::<f64>()
                    / neigh.len() as f64;
                1.0 / reach.max(REACH_FLOOR)
            })
            .collect();
        deadline.check("local outlier factor")?;

        let scores: Vec<f64> = (0..n)
            .map(|i| {
                let neigh = nb.nearest(i, k);
                neigh.iter().map(|&o| lrd[o] / lrd[i]).sum::<f64>() / neigh.len() as f64
            })
            .collect();
        let threshold = contamination_threshold(&scores, self.contamination).max(1.0 + INLIER_MARGIN);
        Ok(StrategyOutput::above(scores, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_outlier() -> Vec<Vec<f64>> {
        let mut rows = Vec::new();
        for i in 0..7 {
            for j in 0..7 {
                rows.push(vec![i as f64 * 0.1, j as f64 * 0.1]);
            }
        }
        rows.push(vec![5.0, 5.0]);
        rows
    }

    #[test]
    fn isolated_point_has_largest_factor() {
        let rows = grid_with_outlier();
        let out = LocalOutlierFactor::new(5, 0.05)
            .score(&rows, &Deadline::unbounded())
            .unwrap();
        let last = rows.len() - 1;
        assert!(out.scores[last] > 10.0);
        assert!(out.flags[last]);
        assert!(out.scores[..last].iter().all(|s| *s < out.scores[last]));
    }

    #[test]
    fn duplicates_do_not_divide_by_zero() {
        let rows = vec![vec![1.0, 1.0]; 30];
        let out = LocalOutlierFactor::new(5, 0.1)
            .score(&rows, &Deadline::unbounded())
            .unwrap();
        assert!(out.scores.iter().all(|s| s.is_finite()));
        assert!(out.flags.iter().all(|f| !f));
    }
}
