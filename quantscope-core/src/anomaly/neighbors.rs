//! Brute-force pairwise distances shared by the neighbourhood strategies.

use crate::budget::Deadline;
use crate::error::AnalyticsError;

pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Dense symmetric distance matrix plus, per point, the other points
/// ordered by distance.
pub(crate) struct Neighborhoods {
    n: usize,
    dist: Vec<f64>,
    order: Vec<Vec<usize>>,
}

impl Neighborhoods {
    pub(crate) fn build(rows: &[Vec<f64>], deadline: &Deadline) -> Result<Self, AnalyticsError> {
        let n = rows.len();
        let mut dist = vec![0.0; n * n];
        for i in 0..n {
            if i % 64 == 0 {
                deadline.check("neighbour search")?;
            }
            for j in (i + 1)..n {
                let d = euclidean(&rows[i], &rows[j]);
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }
        let mut order = Vec::with_capacity(n);
        for i in 0..n {
            let mut others: Vec<usize> = (0..n).filter(|&j| j != i).collect();
            others.sort_by(|&a, &b| dist[i * n + a].total_cmp(&dist[i * n + b]));
            order.push(others);
        }
        Ok(Self { n, dist, order })
    }

    pub(crate) fn len(&self) -> usize {
        self.n
    }

    pub(crate) fn distance(&self, i: usize, j: usize) -> f64 {
        self.dist[i * self.n + j]
    }

    /// The `k` nearest other points of `i`.
    pub(crate) fn nearest(&self, i: usize, k: usize) -> &[usize] {
        let order = &self.order[i];
        &order[..k.min(order.len())]
    }

    /// Distance from `i` to its k-th nearest other point (1-based).
    pub(crate) fn k_distance(&self, i: usize, k: usize) -> f64 {
        match self.nearest(i, k).last() {
            Some(&j) => self.distance(i, j),
            None => 0.0,
        }
    }

    /// All points within `eps` of `i`, excluding `i`.
    pub(crate) fn within(&self, i: usize, eps: f64) -> impl Iterator<Item = usize> + '_ {
        self.order[i]
            .iter()
            .copied()
            .take_while(move |&j| self.distance(i, j) <= eps)
    }
}
