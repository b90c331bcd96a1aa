//! The analytics engine: one instance owns the config, data provider,
//! result cache and worker pool.
//!
//! Requests are validated and their data fetched up front, so
//! `InvalidParameter` and `DataUnavailable` come back as `Err` before any
//! computation starts. After that every section runs in isolation: a
//! failure is recorded against its section and the rest of the result is
//! still returned.
//!
//! Sections of one asset run in parallel (`rayon::join`), and so do the
//! assets of a portfolio. Only the cross-asset aggregation runs after the
//! per-asset work has finished.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use quantscope_core::anomaly::{AnomalyDetector, AnomalyResult};
use quantscope_core::config::AnalyticsConfig;
use quantscope_core::correlation::{CorrelationAnalyzer, CorrelationResult, SectorMap};
use quantscope_core::data::{DataProvider, DataSource};
use quantscope_core::fingerprint::{DataVersion, ParamHash};
use quantscope_core::indicators::{IndicatorSet, IndicatorSuite};
use quantscope_core::risk::{RiskAnalyzer, RiskReport};
use quantscope_core::{AnalyticsError, Deadline, Interval, PriceSeries};

use crate::alerts::{AlertRules, AlertSink};
use crate::cache::{AnalysisKind, CacheKey, CacheOutcome, CacheStats, Cached, ResultCache, TtlPolicy};
use crate::options::{validate_levels, AnalysisOptions, RequestPlan};
use crate::portfolio::{
    component_var, resolve_weights, stress_test, PortfolioRisk, StressTestResult,
};
use crate::reporting::MarketReport;
use crate::result::{
    AnalyticsResult, OverallStatus, PortfolioMetadata, PortfolioResult, PriceSnapshot,
    ResultMetadata, Section, SectionReport, SectionStatus,
};
use crate::signals::synthesize;
use crate::store::CacheStore;

/// Title of reports built by `generate_report`.
pub const REPORT_TITLE: &str = "QuantScope Market Report";

/// Correlated pairs listed in a generated report.
pub const REPORT_TOP_PAIRS: usize = 5;

struct Alerting {
    rules: AlertRules,
    sink: Arc<dyn AlertSink>,
}

pub struct AnalyticsEngine {
    config: AnalyticsConfig,
    provider: Arc<dyn DataProvider>,
    cache: ResultCache,
    pool: rayon::ThreadPool,
    suite: IndicatorSuite,
    correlation: CorrelationAnalyzer,
    risk: RiskAnalyzer,
    anomaly: AnomalyDetector,
    alerting: Option<Alerting>,
    sectors: Option<SectorMap>,
    end: Option<DateTime<Utc>>,
}

impl AnalyticsEngine {
    /// Validate `config`, build every analyzer and the worker pool.
    pub fn new(
        config: AnalyticsConfig,
        provider: Arc<dyn DataProvider>,
    ) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let suite = IndicatorSuite::from_config(&config.indicators)?;
        let correlation = CorrelationAnalyzer::new(config.correlation.clone())?;
        let risk = RiskAnalyzer::new(config.risk.clone())?;
        let anomaly = AnomalyDetector::new(config.anomaly.clone())?;

        // 0 lets rayon pick one thread per core.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.engine.worker_threads)
            .thread_name(|i| format!("quantscope-worker-{i}"))
            .build()
            .map_err(|e| AnalyticsError::component("thread_pool", e.to_string()))?;

        let cache = ResultCache::new(TtlPolicy::from_config(&config.engine));
        info!(
            provider = provider.name(),
            threads = pool.current_num_threads(),
            budget_ms = config.engine.compute_budget_ms,
            "analytics engine ready"
        );

        Ok(Self {
            config,
            provider,
            cache,
            pool,
            suite,
            correlation,
            risk,
            anomaly,
            alerting: None,
            sectors: None,
            end: None,
        })
    }

    /// Mirror computed results into an external store and consult it on a
    /// memory miss.
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = ResultCache::new(*self.cache.ttl()).with_store(store);
        self
    }

    pub fn with_alerts(mut self, rules: AlertRules, sink: Arc<dyn AlertSink>) -> Self {
        self.alerting = Some(Alerting { rules, sink });
        self
    }

    /// Sector assignments used for intra/inter sector correlation means.
    pub fn with_sectors(mut self, sectors: SectorMap) -> Self {
        self.sectors = Some(sectors);
        self
    }

    /// Pin the end of every requested range instead of using "now".
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached result involving `symbol`.
    pub fn invalidate(&self, symbol: &str) -> usize {
        let removed = self.cache.invalidate(symbol);
        info!(symbol, removed, "invalidated cached results");
        removed
    }

    // ─── Operations ──────────────────────────────────────────────────

    /// Indicators, risk and anomalies for one asset, plus a combined signal.
    pub fn analyze_single_asset(
        &self,
        symbol: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalyticsResult, AnalyticsError> {
        let plan = options.resolve(&self.config)?;
        let series = self.fetch(symbol, plan.lookback_days)?;
        let benchmark = self.fetch_benchmark(std::slice::from_ref(&series), plan.lookback_days);
        let deadline = self.deadline();

        let result = self
            .pool
            .install(|| self.analyze_series(&series, benchmark.as_ref(), &plan, &deadline));
        self.raise_alerts(&result);
        info!(
            symbol,
            status = result.status().as_str(),
            signal = result.trading_signals.overall.as_str(),
            elapsed_ms = result.metadata.elapsed_ms,
            "asset analysis complete"
        );
        Ok(result)
    }

    /// `analyze_single_asset` with the configured defaults.
    pub fn analyze_stock(&self, symbol: &str) -> Result<AnalyticsResult, AnalyticsError> {
        self.analyze_single_asset(symbol, &AnalysisOptions::default())
    }

    /// Per-asset analysis of every symbol, then correlation across them and
    /// component VaR for `weights` (equal weights when `None`).
    ///
    /// A symbol the provider cannot serve fails the whole request.
    pub fn analyze_portfolio(
        &self,
        symbols: &[String],
        weights: Option<&BTreeMap<String, f64>>,
        options: &AnalysisOptions,
    ) -> Result<PortfolioResult, AnalyticsError> {
        let started = Instant::now();
        validate_portfolio(symbols)?;
        let weights = resolve_weights(symbols, weights)?;
        let plan = options.resolve(&self.config)?;

        let series: Vec<PriceSeries> = self.pool.install(|| {
            symbols
                .par_iter()
                .map(|s| self.fetch(s, plan.lookback_days))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let benchmark = self.fetch_benchmark(&series, plan.lookback_days);
        let deadline = self.deadline();

        let (assets, (correlation, correlation_report), (risk, risk_report)) =
            self.pool.install(|| {
                let assets: Vec<AnalyticsResult> = series
                    .par_iter()
                    .map(|s| self.analyze_series(s, benchmark.as_ref(), &plan, &deadline))
                    .collect();
                let correlation = self.correlation_section(&series, &plan, &deadline);
                let risk = self.portfolio_risk_section(&series, &weights, &plan, &deadline);
                (assets, correlation, risk)
            });

        for asset in &assets {
            self.raise_alerts(asset);
        }
        let assets: BTreeMap<String, AnalyticsResult> = assets
            .into_iter()
            .map(|a| (a.symbol.clone(), a))
            .collect();
        let status = portfolio_status(&assets, &[correlation_report.status, risk_report.status]);
        let elapsed_ms = millis_since(started);
        info!(
            assets = assets.len(),
            status = status.as_str(),
            elapsed_ms,
            "portfolio analysis complete"
        );

        Ok(PortfolioResult {
            symbols: symbols.to_vec(),
            metadata: PortfolioMetadata {
                status,
                assets: assets
                    .iter()
                    .map(|(s, a)| (s.clone(), a.status()))
                    .collect(),
                correlation: correlation_report,
                risk: risk_report,
                generated_at: Utc::now(),
                elapsed_ms,
            },
            assets,
            correlation,
            risk,
        })
    }

    /// Shock scenario over a book of `portfolio_value` split across
    /// `symbols` by `weights` (equal weights when `None`).
    ///
    /// Every symbol must be servable by the provider, as in
    /// `analyze_portfolio`.
    pub fn stress_test(
        &self,
        symbols: &[String],
        weights: Option<&BTreeMap<String, f64>>,
        shocks: &BTreeMap<String, f64>,
        portfolio_value: f64,
    ) -> Result<StressTestResult, AnalyticsError> {
        validate_portfolio(symbols)?;
        let weights = resolve_weights(symbols, weights)?;
        let result = stress_test(&weights, shocks, portfolio_value)?;
        self.pool.install(|| {
            symbols
                .par_iter()
                .try_for_each(|s| self.fetch(s, self.config.engine.lookback_days).map(drop))
        })?;
        info!(
            assets = symbols.len(),
            shocked = shocks.len(),
            impact_percentage = result.impact_percentage,
            "stress test complete"
        );
        Ok(result)
    }

    /// Portfolio analysis of `symbols` summarized as a `MarketReport`.
    pub fn generate_report(&self, symbols: &[String]) -> Result<MarketReport, AnalyticsError> {
        let portfolio = self.analyze_portfolio(symbols, None, &AnalysisOptions::default())?;
        let mut report = MarketReport::from_portfolio(REPORT_TITLE, &portfolio, REPORT_TOP_PAIRS)
            .with_cache_stats(self.cache_stats());
        if self.provider.source() == DataSource::Synthetic {
            report
                .notes
                .push("prices are synthetic; figures are not market data".into());
        }
        Ok(report)
    }

    /// Risk report for `symbol` at the given confidence levels.
    pub fn get_risk_metrics(
        &self,
        symbol: &str,
        confidence_levels: &[f64],
    ) -> Result<RiskReport, AnalyticsError> {
        validate_levels(confidence_levels)?;
        let lookback_days = self.config.engine.lookback_days;
        let series = self.fetch(symbol, lookback_days)?;
        let benchmark = self.fetch_benchmark(std::slice::from_ref(&series), lookback_days);
        let benchmark = benchmark.as_ref().filter(|b| b.symbol() != symbol);
        let deadline = self.deadline();

        let report = self.pool.install(|| {
            self.risk_report(&series, benchmark, confidence_levels, lookback_days, &deadline)
        })?;
        if let Some(alerting) = &self.alerting {
            for alert in alerting.rules.check_risk(symbol, &report.value.metrics) {
                alerting.sink.deliver(alert);
            }
        }
        Ok(RiskReport::clone(&report.value))
    }

    /// Anomalies over the most recent `window` bars, or the whole lookback
    /// when `window` is `None`.
    pub fn get_anomalies(
        &self,
        symbol: &str,
        window: Option<usize>,
    ) -> Result<AnomalyResult, AnalyticsError> {
        if window == Some(0) {
            return Err(AnalyticsError::invalid("window", "must be at least one bar"));
        }
        let lookback_days = self.config.engine.lookback_days;
        let series = self.fetch(symbol, lookback_days)?;
        let series = match window {
            Some(n) => series.tail(n),
            None => series,
        };
        let deadline = self.deadline();

        let result = self
            .pool
            .install(|| self.anomalies(&series, window, lookback_days, &deadline))?;
        if let Some(alerting) = &self.alerting {
            for alert in alerting.rules.check_anomalies(&result.value) {
                alerting.sink.deliver(alert);
            }
        }
        Ok(AnomalyResult::clone(&result.value))
    }

    /// The configured indicator suite over `symbol`.
    pub fn get_indicators(&self, symbol: &str) -> Result<IndicatorSet, AnalyticsError> {
        let lookback_days = self.config.engine.lookback_days;
        let series = self.fetch(symbol, lookback_days)?;
        let deadline = self.deadline();
        let set = self
            .pool
            .install(|| self.indicators(&series, lookback_days, &deadline))?;
        Ok(IndicatorSet::clone(&set.value))
    }

    // ─── Sections ────────────────────────────────────────────────────

    fn analyze_series(
        &self,
        series: &PriceSeries,
        benchmark: Option<&PriceSeries>,
        plan: &RequestPlan,
        deadline: &Deadline,
    ) -> AnalyticsResult {
        let started = Instant::now();
        let symbol = series.symbol();
        let benchmark = benchmark.filter(|b| b.symbol() != symbol);
        let levels = &plan.confidence_levels;
        let lookback = plan.lookback_days;
        let windowed = plan.anomaly_window.map(|n| series.tail(n));
        let anomaly_input = windowed.as_ref().unwrap_or(series);

        let ((indicators, risk), anomalies) = rayon::join(
            || {
                rayon::join(
                    || {
                        timed(symbol, "indicators", || {
                            self.indicators(series, lookback, deadline).map(shared)
                        })
                    },
                    || {
                        timed(symbol, "risk", || {
                            self.risk_report(series, benchmark, levels, lookback, deadline)
                                .map(shared)
                        })
                    },
                )
            },
            || {
                timed(symbol, "anomalies", || {
                    self.anomalies(anomaly_input, plan.anomaly_window, lookback, deadline)
                        .map(shared)
                })
            },
        );
        let (indicators, indicators_report) = indicators;
        let (risk, risk_report) = risk;
        let (anomalies, anomalies_report) = anomalies;

        let sources = [
            self.suite.rsi_key(),
            self.suite.macd_key(),
            self.suite.bollinger_key(),
            self.suite.stochastic_key(),
        ];
        let trading_signals =
            synthesize(indicators.value(), &sources, risk.value(), anomalies.value());

        let sections = BTreeMap::from([
            ("indicators".to_string(), indicators_report),
            ("risk".to_string(), risk_report),
            ("anomalies".to_string(), anomalies_report),
        ]);
        let status = OverallStatus::from_sections(sections.values().map(|r| r.status));

        AnalyticsResult {
            symbol: symbol.to_string(),
            data_version: series.version(),
            price: PriceSnapshot::of(series),
            indicators,
            risk,
            anomalies,
            trading_signals,
            metadata: ResultMetadata {
                status,
                sections,
                data_source: self.provider.source(),
                bars: series.len(),
                generated_at: Utc::now(),
                elapsed_ms: millis_since(started),
            },
        }
    }

    fn indicators(
        &self,
        series: &PriceSeries,
        lookback_days: i64,
        deadline: &Deadline,
    ) -> Result<Cached<IndicatorSet>, AnalyticsError> {
        let key = CacheKey::new(
            series.symbol(),
            AnalysisKind::Indicators,
            ParamHash::of(&(&self.config.indicators, lookback_days))?,
            series.version(),
        );
        self.cache
            .get_or_compute(&key, deadline, || self.suite.compute_within(series, deadline))
    }

    fn risk_report(
        &self,
        series: &PriceSeries,
        benchmark: Option<&PriceSeries>,
        levels: &[f64],
        lookback_days: i64,
        deadline: &Deadline,
    ) -> Result<Cached<RiskReport>, AnalyticsError> {
        let params = ParamHash::of(&(
            &self.config.risk,
            levels,
            benchmark.map(|b| b.symbol()),
            lookback_days,
        ))?;
        let version = match benchmark {
            Some(b) => DataVersion::combine(&[series.version(), b.version()]),
            None => series.version(),
        };
        let key = CacheKey::new(series.symbol(), AnalysisKind::Risk, params, version);
        self.cache.get_or_compute(&key, deadline, || {
            self.risk.analyze_at(series, benchmark, levels, deadline)
        })
    }

    fn anomalies(
        &self,
        series: &PriceSeries,
        window: Option<usize>,
        lookback_days: i64,
        deadline: &Deadline,
    ) -> Result<Cached<AnomalyResult>, AnalyticsError> {
        let key = CacheKey::new(
            series.symbol(),
            AnalysisKind::Anomaly,
            ParamHash::of(&(&self.config.anomaly, window, lookback_days))?,
            series.version(),
        );
        self.cache
            .get_or_compute(&key, deadline, || self.anomaly.detect(series, deadline))
    }

    fn correlation_section(
        &self,
        series: &[PriceSeries],
        plan: &RequestPlan,
        deadline: &Deadline,
    ) -> (Section<CorrelationResult>, SectionReport) {
        if series.len() < 2 {
            return skipped("correlation needs at least two assets");
        }
        let mut sorted = series.to_vec();
        sorted.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        let label = sorted
            .iter()
            .map(PriceSeries::symbol)
            .collect::<Vec<_>>()
            .join(",");

        timed(&label, "correlation", || {
            let versions: Vec<DataVersion> = sorted.iter().map(PriceSeries::version).collect();
            let key = CacheKey::new(
                label.clone(),
                AnalysisKind::Correlation,
                ParamHash::of(&(&self.config.correlation, &self.sectors, plan.lookback_days))?,
                DataVersion::combine(&versions),
            );
            self.cache
                .get_or_compute(&key, deadline, || match &self.sectors {
                    Some(sectors) => {
                        self.correlation
                            .analyze_with_sectors(&sorted, sectors, deadline)
                    }
                    None => self.correlation.analyze(&sorted, deadline),
                })
                .map(shared)
        })
    }

    fn portfolio_risk_section(
        &self,
        series: &[PriceSeries],
        weights: &BTreeMap<String, f64>,
        plan: &RequestPlan,
        deadline: &Deadline,
    ) -> (Section<PortfolioRisk>, SectionReport) {
        let confidence = plan.portfolio_confidence();
        timed("portfolio", "portfolio_risk", || {
            deadline.check("portfolio risk")?;
            let risk =
                component_var(series, weights, confidence, self.config.risk.min_observations)?;
            Ok((risk, None))
        })
    }

    // ─── Plumbing ────────────────────────────────────────────────────

    fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.config.engine.compute_budget_ms)
    }

    /// `[end - lookback, end]` for a provider request.
    fn window(&self, lookback_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self
            .end
            .unwrap_or_else(|| align_to_interval(Utc::now(), self.config.engine.interval));
        (end - chrono::Duration::days(lookback_days), end)
    }

    fn fetch(&self, symbol: &str, lookback_days: i64) -> Result<PriceSeries, AnalyticsError> {
        validate_symbol(symbol)?;
        let (start, end) = self.window(lookback_days);
        let series = self
            .provider
            .get_price_series(symbol, start, end, self.config.engine.interval)
            .map_err(|e| e.into_analytics(symbol))?;
        debug!(
            symbol,
            bars = series.len(),
            provider = self.provider.name(),
            "fetched price series"
        );
        Ok(series)
    }

    /// The configured benchmark, reusing an already fetched series when the
    /// benchmark is among them. A benchmark that cannot be loaded only
    /// costs beta.
    fn fetch_benchmark(&self, fetched: &[PriceSeries], lookback_days: i64) -> Option<PriceSeries> {
        let symbol = self.config.engine.benchmark.as_deref()?;
        if let Some(series) = fetched.iter().find(|s| s.symbol() == symbol) {
            return Some(series.clone());
        }
        match self.fetch(symbol, lookback_days) {
            Ok(series) => Some(series),
            Err(err) => {
                warn!(benchmark = symbol, error = %err, "benchmark unavailable; beta omitted");
                None
            }
        }
    }

    fn raise_alerts(&self, result: &AnalyticsResult) {
        let Some(alerting) = &self.alerting else {
            return;
        };
        let mut alerts = Vec::new();
        if let Some(report) = result.risk.value() {
            alerts.extend(alerting.rules.check_risk(&result.symbol, &report.metrics));
        }
        if let Some(anomalies) = result.anomalies.value() {
            alerts.extend(alerting.rules.check_anomalies(anomalies));
        }
        for alert in alerts {
            alerting.sink.deliver(alert);
        }
    }
}

fn shared<T: Clone>(cached: Cached<T>) -> (T, Option<CacheOutcome>) {
    (T::clone(&cached.value), Some(cached.outcome))
}

/// Run one section, recording its timing and turning a failure into a
/// `Failed` section instead of an error.
fn timed<T>(
    symbol: &str,
    section: &str,
    run: impl FnOnce() -> Result<(T, Option<CacheOutcome>), AnalyticsError>,
) -> (Section<T>, SectionReport) {
    let started = Instant::now();
    let outcome = run();
    let elapsed_ms = millis_since(started);
    match outcome {
        Ok((value, cache)) => (
            Section::Ok { value },
            SectionReport {
                status: SectionStatus::Ok,
                cache,
                error: None,
                elapsed_ms,
            },
        ),
        Err(error) => {
            warn!(symbol, section, error = %error, "section failed");
            let report = SectionReport {
                status: SectionStatus::Failed,
                cache: None,
                error: Some(error.to_string()),
                elapsed_ms,
            };
            (Section::Failed { error }, report)
        }
    }
}

fn skipped<T>(reason: &str) -> (Section<T>, SectionReport) {
    (
        Section::skipped(reason),
        SectionReport {
            status: SectionStatus::Skipped,
            cache: None,
            error: None,
            elapsed_ms: 0,
        },
    )
}

/// `Failed` when every asset failed, `Degraded` when any asset or
/// cross-asset section lost something.
fn portfolio_status(
    assets: &BTreeMap<String, AnalyticsResult>,
    sections: &[SectionStatus],
) -> OverallStatus {
    if !assets.is_empty() && assets.values().all(|a| a.status() == OverallStatus::Failed) {
        return OverallStatus::Failed;
    }
    let degraded = assets.values().any(|a| a.status() != OverallStatus::Ok)
        || sections.contains(&SectionStatus::Failed);
    if degraded {
        OverallStatus::Degraded
    } else {
        OverallStatus::Ok
    }
}

fn validate_symbol(symbol: &str) -> Result<(), AnalyticsError> {
    if symbol.trim().is_empty() {
        return Err(AnalyticsError::invalid("symbol", "must not be empty"));
    }
    if symbol.contains(',') {
        return Err(AnalyticsError::invalid(
            "symbol",
            format!("'{symbol}' must not contain a comma"),
        ));
    }
    Ok(())
}

fn validate_portfolio(symbols: &[String]) -> Result<(), AnalyticsError> {
    if symbols.is_empty() {
        return Err(AnalyticsError::invalid("symbols", "at least one symbol is required"));
    }
    let mut seen = BTreeSet::new();
    for symbol in symbols {
        validate_symbol(symbol)?;
        if !seen.insert(symbol.as_str()) {
            return Err(AnalyticsError::invalid(
                "symbols",
                format!("duplicate symbol '{symbol}'"),
            ));
        }
    }
    Ok(())
}

/// Round `t` down to a whole number of intervals since the epoch, so every
/// request within one interval sees the same range.
fn align_to_interval(t: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    let step = interval.duration().num_seconds().max(1);
    let secs = t.timestamp();
    Utc.timestamp_opt(secs - secs.rem_euclid(step), 0)
        .single()
        .unwrap_or(t)
}

fn millis_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_validated() {
        assert!(validate_symbol("SPY").is_ok());
        assert_eq!(validate_symbol(" ").unwrap_err().kind(), "invalid_parameter");
        assert_eq!(validate_symbol("SPY,QQQ").unwrap_err().kind(), "invalid_parameter");
    }

    #[test]
    fn duplicate_portfolio_symbols_are_rejected() {
        let symbols = vec!["SPY".to_string(), "QQQ".to_string(), "SPY".to_string()];
        let err = validate_portfolio(&symbols).unwrap_err();
        assert!(err.to_string().contains("duplicate symbol 'SPY'"));
        assert!(validate_portfolio(&[]).is_err());
    }

    #[test]
    fn end_is_aligned_to_interval() {
        let t = Utc.with_ymd_and_hms(2024, 3, 5, 15, 47, 12).unwrap();
        assert_eq!(
            align_to_interval(t, Interval::Day1),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            align_to_interval(t, Interval::Hour1),
            Utc.with_ymd_and_hms(2024, 3, 5, 15, 0, 0).unwrap()
        );
        assert_eq!(
            align_to_interval(t, Interval::Minute15),
            Utc.with_ymd_and_hms(2024, 3, 5, 15, 45, 0).unwrap()
        );
    }
}
