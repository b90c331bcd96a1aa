//! QuantScope Core: domain types, data providers, and the analytics components.
//!
//! This crate contains the numerical heart of QuantScope:
//! - Domain types (bars, price series, intervals)
//! - Data provider trait with in-memory, CSV and synthetic sources
//! - Technical indicators with a configurable suite
//! - Cross-asset correlation with significance, rolling regimes and sectors
//! - Volatility, VaR/CVaR, risk-adjusted ratios and drawdown
//! - Anomaly detection: pluggable strategies, voting, rule detectors
//!
//! Every component is a pure function of immutable series plus its config.
//! Orchestration and caching live in `quantscope-runner`.

pub mod anomaly;
pub mod budget;
pub mod config;
pub mod correlation;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod risk;
pub mod rng;
pub mod serde_nan;
pub mod stats;

pub use budget::Deadline;
pub use config::AnalyticsConfig;
pub use domain::{Bar, Interval, PriceSeries};
pub use error::AnalyticsError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner fans out across worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();

        // Results
        require_send::<indicators::IndicatorResult>();
        require_sync::<indicators::IndicatorResult>();
        require_send::<correlation::CorrelationResult>();
        require_sync::<correlation::CorrelationResult>();
        require_send::<risk::RiskReport>();
        require_sync::<risk::RiskReport>();
        require_send::<anomaly::AnomalyResult>();
        require_sync::<anomaly::AnomalyResult>();
        require_send::<error::AnalyticsError>();
        require_sync::<error::AnalyticsError>();

        // Analyzers
        require_send::<indicators::IndicatorSuite>();
        require_sync::<indicators::IndicatorSuite>();
        require_send::<correlation::CorrelationAnalyzer>();
        require_sync::<correlation::CorrelationAnalyzer>();
        require_send::<risk::RiskAnalyzer>();
        require_sync::<risk::RiskAnalyzer>();
        require_send::<anomaly::AnomalyDetector>();
        require_sync::<anomaly::AnomalyDetector>();

        // Data sources
        require_send::<data::InMemoryProvider>();
        require_sync::<data::InMemoryProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();

        // Fingerprints and RNG
        require_send::<fingerprint::DataVersion>();
        require_sync::<fingerprint::DataVersion>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
    }

    /// Architecture contract: indicators see one asset's series and nothing else.
    #[test]
    fn indicator_trait_takes_only_a_series() {
        fn _check_trait_object_builds(
            ind: &dyn indicators::Indicator,
            series: &PriceSeries,
        ) -> indicators::IndicatorResult {
            ind.compute(series)
        }
    }

    /// Architecture contract: strategies score standardized rows, not series.
    #[test]
    fn anomaly_strategy_scores_feature_rows() {
        fn _check_trait_object_builds(
            s: &dyn anomaly::AnomalyStrategy,
            rows: &[Vec<f64>],
        ) -> Result<anomaly::StrategyOutput, AnalyticsError> {
            s.score(rows, &Deadline::unbounded())
        }
    }
}
