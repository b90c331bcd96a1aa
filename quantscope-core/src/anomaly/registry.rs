//! Strategy lookup table: name → constructor.

use super::dbscan::DensityCluster;
use super::isolation_forest::IsolationForest;
use super::lof::LocalOutlierFactor;
use super::one_class::OneClassBoundary;
use super::AnomalyStrategy;
use crate::config::AnomalyConfig;
use crate::error::AnalyticsError;

/// Builds a strategy from the anomaly config and a per-symbol seed.
pub type StrategyCtor = fn(&AnomalyConfig, u64) -> Box<dyn AnomalyStrategy>;

pub const DEFAULT_STRATEGIES: &[&str] = &[
    "isolation_forest",
    "local_outlier_factor",
    "one_class",
    "density_cluster",
];

const REGISTRY: &[(&str, StrategyCtor)] = &[
    ("isolation_forest", isolation_forest),
    ("local_outlier_factor", local_outlier_factor),
    ("one_class", one_class),
    ("density_cluster", density_cluster),
];

fn isolation_forest(c: &AnomalyConfig, seed: u64) -> Box<dyn AnomalyStrategy> {
    Box::new(IsolationForest::new(
        c.n_estimators,
        c.max_samples,
        c.contamination,
        seed,
    ))
}

fn local_outlier_factor(c: &AnomalyConfig, _seed: u64) -> Box<dyn AnomalyStrategy> {
    Box::new(LocalOutlierFactor::new(c.lof_neighbors, c.contamination))
}

fn one_class(c: &AnomalyConfig, _seed: u64) -> Box<dyn AnomalyStrategy> {
    Box::new(OneClassBoundary::new(c.contamination))
}

fn density_cluster(c: &AnomalyConfig, _seed: u64) -> Box<dyn AnomalyStrategy> {
    Box::new(DensityCluster::new(
        c.dbscan_eps,
        c.dbscan_min_points,
        c.contamination,
    ))
}

pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.iter().any(|(n, _)| *n == name)
}

pub fn build(
    name: &str,
    config: &AnomalyConfig,
    seed: u64,
) -> Result<Box<dyn AnomalyStrategy>, AnalyticsError> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, ctor)| ctor(config, seed))
        .ok_or_else(|| AnalyticsError::invalid("strategies", format!("unknown strategy '{name}'")))
}
