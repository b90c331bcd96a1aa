//! QuantScope Runner: orchestration on top of `quantscope-core`.
//!
//! This crate provides:
//! - `AnalyticsEngine`: single-asset and portfolio analysis on a private
//!   worker pool, with per-section status and eager validation
//! - `AnalysisOptions`: per-request lookback, VaR levels and anomaly window
//! - A single-flight result cache with per-kind TTLs and an optional
//!   external `CacheStore`
//! - Signal synthesis, portfolio component VaR, stress scenarios and
//!   threshold alerts
//! - Market reports rendered to Markdown, JSON and CSV

pub mod alerts;
pub mod cache;
pub mod engine;
pub mod options;
pub mod portfolio;
pub mod reporting;
pub mod result;
pub mod signals;
pub mod store;

pub use alerts::{Alert, AlertRules, AlertSink, CollectingSink, LogSink, Severity};
pub use cache::{
    AnalysisKind, CacheKey, CacheOutcome, CacheStats, Cached, ResultCache, TtlPolicy,
};
pub use engine::AnalyticsEngine;
pub use options::AnalysisOptions;
pub use portfolio::{
    component_var, resolve_weights, stress_test, AssetImpact, AssetRiskContribution,
    PortfolioRisk, StressTestResult,
};
pub use reporting::{export_report, MarketReport, ReportPaths, SymbolSummary};
pub use result::{
    AnalyticsResult, OverallStatus, PortfolioResult, PriceSnapshot, Section, SectionReport,
    SectionStatus,
};
pub use signals::{synthesize, OverallSignal, TradingSignals};
pub use store::{CacheStore, MemoryStore, StoreError};
