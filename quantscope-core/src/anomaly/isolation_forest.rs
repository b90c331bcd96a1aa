//! Isolation forest.
//!
//! Anomalies are isolated by fewer random axis-aligned splits. The score is
//! 2^(−E[h(x)] / c(ψ)), where h is the path length and c(ψ) the average
//! path length of an unsuccessful BST search over ψ samples. Points above
//! the (1 − contamination) score quantile are flagged.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{contamination_threshold, AnomalyStrategy, StrategyOutput};
use crate::budget::Deadline;
use crate::error::AnalyticsError;

const EULER_GAMMA: f64 = 0.577_215_664_9;

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

struct Tree {
    root: Node,
}

impl Tree {
    fn build(rows: &[Vec<f64>], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(rows, sample, 0, max_depth, rng),
        }
    }

    fn build_node(
        rows: &[Vec<f64>],
        idx: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        if depth >= max_depth || idx.len() <= 1 {
            return Node::Leaf { size: idx.len() };
        }
        let width = rows[idx[0]].len();
        if width == 0 {
            return Node::Leaf { size: idx.len() };
        }
        let feature = rng.gen_range(0..width);
        let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
        });
        if hi - lo < 1e-10 {
            return Node::Leaf { size: idx.len() };
        }
        let threshold = rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            idx.into_iter().partition(|&i| rows[i][feature] < threshold);
        if left.is_empty() || right.is_empty() {
            return Node::Leaf {
                size: left.len() + right.len(),
            };
        }
        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::build_node(rows, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(rows, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a BST of `n` nodes.
pub fn average_path(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples,
            contamination,
            seed,
        }
    }
}

impl AnomalyStrategy for IsolationForest {
    fn name(&self) -> &str {
        "isolation_forest"
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("n_estimators".to_string(), self.n_estimators as f64),
            ("max_samples".to_string(), self.max_samples as f64),
            ("contamination".to_string(), self.contamination),
        ])
    }

    fn score(&self, rows: &[Vec<f64>], deadline: &Deadline) -> Result<StrategyOutput, AnalyticsError> {
        let n = rows.len();
        if n < 2 {
            return Ok(StrategyOutput::quiet(n));
        }
        let psi = self.max_samples.min(n);
        let max_depth = (psi as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            deadline.check("isolation forest")?;
            let sample = rand::seq::index::sample(&mut rng, n, psi).into_vec();
            trees.push(Tree::build(rows, sample, max_depth, &mut rng));
        }

        let c = average_path(psi);
        let scores: Vec<f64> = rows
            .iter()
            .map(|row| {
                let mean_path =
                    trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees.len() as f64;
                if c > 0.0 {
                    2f64.powf(-mean_path / c)
                } else {
                    0.5
                }
            })
            .collect();
        let threshold = contamination_threshold(&scores, self.contamination);
        Ok(StrategyOutput::above(scores, threshold))
    }
}
