//! Density clustering (DBSCAN). Noise points are the anomalies.
//!
//! Without a configured `eps`, the radius is the (1 − contamination)
//! quantile of every point's distance to its `min_points`-th neighbour.

use std::collections::{BTreeMap, VecDeque};

use super::neighbors::Neighborhoods;
use super::{AnomalyStrategy, StrategyOutput};
use crate::budget::Deadline;
use crate::error::AnalyticsError;
use crate::stats::quantile;

pub struct DensityCluster {
    eps: Option<f64>,
    min_points: usize,
    contamination: f64,
}

/// Cluster labels; `None` marks noise.
pub(crate) struct Clustering {
    pub labels: Vec<Option<usize>>,
    pub clusters: usize,
    pub eps: f64,
}

impl DensityCluster {
    pub fn new(eps: Option<f64>, min_points: usize, contamination: f64) -> Self {
        Self {
            eps,
            min_points,
            contamination,
        }
    }

    pub(crate) fn cluster(&self, nb: &Neighborhoods) -> Clustering {
        let n = nb.len();
        // min_points counts the point itself
        let k = self.min_points.saturating_sub(1).clamp(1, n.saturating_sub(1).max(1));
        let eps = self.eps.unwrap_or_else(|| {
            let kd: Vec<f64> = (0..n).map(|i| nb.k_distance(i, k)).collect();
            quantile(&kd, 1.0 - self.contamination)
        });

        let core: Vec<bool> = (0..n)
            .map(|i| nb.within(i, eps).count() + 1 >= self.min_points)
            .collect();
        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut clusters = 0;
        for start in 0..n {
            if !core[start] || labels[start].is_some() {
                continue;
            }
            let id = clusters;
            clusters += 1;
            labels[start] = Some(id);
            let mut queue = VecDeque::from([start]);
            while let Some(p) = queue.pop_front() {
                if !core[p] {
                    continue;
                }
                for q in nb.within(p, eps) {
                    if labels[q].is_none() {
                        labels[q] = Some(id);
                        queue.push_back(q);
                    }
                }
            }
        }
        Clustering {
            labels,
            clusters,
            eps,
        }
    }
}

impl AnomalyStrategy for DensityCluster {
    fn name(&self) -> &str {
        "density_cluster"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut p = BTreeMap::from([
            ("min_points".to_string(), self.min_points as f64),
            ("contamination".to_string(), self.contamination),
        ]);
        if let Some(eps) = self.eps {
            p.insert("eps".to_string(), eps);
        }
        p
    }

    fn score(&self, rows: &[Vec<f64>], deadline: &Deadline) -> Result<StrategyOutput, AnalyticsError> {
        let n = rows.len();
        if n < 2 {
            return Ok(StrategyOutput::quiet(n));
        }
        let nb = Neighborhoods::build(rows, deadline)?;
        let clustering = self.cluster(&nb);
        deadline.check("density clustering")?;

        // eps of 0 means every point coincides with its neighbours
        if !(clustering.eps > 0.0) {
            return Ok(StrategyOutput::quiet(n));
        }
        let k = self.min_points.saturating_sub(1).clamp(1, n - 1);
        let scores: Vec<f64> = (0..n).map(|i| nb.k_distance(i, k) / clustering.eps).collect();
        let flags = clustering.labels.iter().map(Option::is_none).collect();
        Ok(StrategyOutput {
            scores,
            flags,
            threshold: 1.0,
        })
    }
}
