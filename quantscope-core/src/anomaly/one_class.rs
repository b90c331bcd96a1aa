//! One-class boundary in standardized feature space.
//!
//! Rows arrive standardized, so the centre of the normal class is the
//! per-feature median and the boundary is a hypersphere whose radius is the
//! (1 − contamination) quantile of distances to it.

use std::collections::BTreeMap;

use super::neighbors::euclidean;
use super::{contamination_threshold, AnomalyStrategy, StrategyOutput};
use crate::budget::Deadline;
use crate::error::AnalyticsError;
use crate::stats::quantile;

pub struct OneClassBoundary {
    contamination: f64,
}

impl OneClassBoundary {
    pub fn new(contamination: f64) -> Self {
        Self { contamination }
    }
}

impl AnomalyStrategy for OneClassBoundary {
    fn name(&self) -> &str {
        "one_class"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([("contamination".to_string(), self.contamination)])
    }

    fn score(&self, rows: &[Vec<f64>], deadline: &Deadline) -> Result<StrategyOutput, AnalyticsError> {
        let Some(first) = rows.first() else {
            return Ok(StrategyOutput::quiet(0));
        };
        deadline.check("one-class boundary")?;
        let centre: Vec<f64> = (0..first.len())
            .map(|j| {
                let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                quantile(&col, 0.5)
            })
            .collect();
        let scores: Vec<f64> = rows.iter().map(|r| euclidean(r, &centre)).collect();
        let radius = contamination_threshold(&scores, self.contamination);
        Ok(StrategyOutput::above(scores, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_point_is_outside_boundary() {
        let mut rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 5) as f64 * 0.1, (i % 7) as f64 * 0.1])
            .collect();
        rows.push(vec![8.0, -8.0]);
        let out = OneClassBoundary::new(0.05)
            .score(&rows, &Deadline::unbounded())
            .unwrap();
        assert!(out.flags[40]);
        assert_eq!(out.flags.iter().filter(|f| **f).count(), out.flagged());
        assert!(out.flagged() <= 3);
    }

    #[test]
    fn all_at_centre_flags_nothing() {
        let rows = vec![vec![0.0; 4]; 20];
        let out = OneClassBoundary::new(0.1)
            .score(&rows, &Deadline::unbounded())
            .unwrap();
        assert_eq!(out.flagged(), 0);
    }
}
