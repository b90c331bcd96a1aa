//! Unified analysis results with per-section status.
//!
//! A section that fails is recorded with its error and the rest of the
//! result is still returned; the overall status reports whether anything
//! was lost.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quantscope_core::anomaly::AnomalyResult;
use quantscope_core::correlation::CorrelationResult;
use quantscope_core::data::DataSource;
use quantscope_core::fingerprint::DataVersion;
use quantscope_core::indicators::IndicatorSet;
use quantscope_core::risk::RiskReport;
use quantscope_core::{AnalyticsError, PriceSeries};

use crate::cache::CacheOutcome;
use crate::portfolio::PortfolioRisk;
use crate::signals::TradingSignals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Ok,
    Failed,
    Skipped,
}

/// Outcome of one analysis section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ok { value: T },
    Failed { error: AnalyticsError },
    Skipped { reason: String },
}

impl<T> Section<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Section::Skipped {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> SectionStatus {
        match self {
            Section::Ok { .. } => SectionStatus::Ok,
            Section::Failed { .. } => SectionStatus::Failed,
            Section::Skipped { .. } => SectionStatus::Skipped,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Section::Ok { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Section::Ok { value } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AnalyticsError> {
        match self {
            Section::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<T, AnalyticsError> {
        match self {
            Section::Ok { value } => Ok(value),
            Section::Failed { error } => Err(error),
            Section::Skipped { reason } => Err(AnalyticsError::component("section", reason)),
        }
    }
}

impl<T> From<Result<T, AnalyticsError>> for Section<T> {
    fn from(result: Result<T, AnalyticsError>) -> Self {
        match result {
            Ok(value) => Section::Ok { value },
            Err(error) => Section::Failed { error },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Ok,
    Degraded,
    Failed,
}

impl OverallStatus {
    /// `Failed` when nothing that ran succeeded, `Degraded` when something
    /// failed, `Ok` otherwise. Skipped sections do not count.
    pub fn from_sections(statuses: impl IntoIterator<Item = SectionStatus>) -> Self {
        let (mut ok, mut failed) = (0, 0);
        for s in statuses {
            match s {
                SectionStatus::Ok => ok += 1,
                SectionStatus::Failed => failed += 1,
                SectionStatus::Skipped => {}
            }
        }
        match (ok, failed) {
            (_, 0) => OverallStatus::Ok,
            (0, _) => OverallStatus::Failed,
            _ => OverallStatus::Degraded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Failed => "failed",
        }
    }
}

/// Orchestration record for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub status: SectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub status: OverallStatus,
    pub sections: BTreeMap<String, SectionReport>,
    pub data_source: DataSource,
    pub bars: usize,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// First and last close of the analyzed range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub first_close: f64,
    pub last_close: f64,
    /// Simple return over the range.
    pub period_return: f64,
    pub as_of: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn of(series: &PriceSeries) -> Option<Self> {
        let first = series.first()?;
        let last = series.last()?;
        let period_return = if first.close > 0.0 {
            last.close / first.close - 1.0
        } else {
            0.0
        };
        Some(Self {
            first_close: first.close,
            last_close: last.close,
            period_return,
            as_of: last.timestamp,
        })
    }
}

/// Everything known about one asset after a full analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub symbol: String,
    pub data_version: DataVersion,
    pub price: Option<PriceSnapshot>,
    pub indicators: Section<IndicatorSet>,
    pub risk: Section<RiskReport>,
    pub anomalies: Section<AnomalyResult>,
    pub trading_signals: TradingSignals,
    pub metadata: ResultMetadata,
}

impl AnalyticsResult {
    pub fn status(&self) -> OverallStatus {
        self.metadata.status
    }

    /// Sections that failed, with their errors.
    pub fn failures(&self) -> Vec<(&'static str, &AnalyticsError)> {
        [
            ("indicators", self.indicators.error()),
            ("risk", self.risk.error()),
            ("anomalies", self.anomalies.error()),
        ]
        .into_iter()
        .filter_map(|(name, err)| err.map(|e| (name, e)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetadata {
    pub status: OverallStatus,
    /// Per-asset overall status.
    pub assets: BTreeMap<String, OverallStatus>,
    pub correlation: SectionReport,
    pub risk: SectionReport,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Per-asset results plus the cross-asset sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub symbols: Vec<String>,
    pub assets: BTreeMap<String, AnalyticsResult>,
    pub correlation: Section<CorrelationResult>,
    pub risk: Section<PortfolioRisk>,
    pub metadata: PortfolioMetadata,
}

impl PortfolioResult {
    pub fn status(&self) -> OverallStatus {
        self.metadata.status
    }

    pub fn asset(&self, symbol: &str) -> Option<&AnalyticsResult> {
        self.assets.get(symbol)
    }
}
