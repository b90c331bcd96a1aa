//! Market report model: one summary row per symbol plus cross-asset figures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quantscope_core::correlation::PairCorrelation;
use quantscope_core::risk::VolatilityRegime;

use crate::cache::CacheStats;
use crate::result::{AnalyticsResult, OverallStatus, PortfolioResult};
use crate::signals::OverallSignal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub status: OverallStatus,
    pub last_close: Option<f64>,
    pub period_return: Option<f64>,
    pub rsi: Option<f64>,
    pub signal: OverallSignal,
    pub confidence: f64,
    /// Annualized historical volatility.
    pub volatility: Option<f64>,
    pub regime: Option<VolatilityRegime>,
    pub var_95: Option<f64>,
    pub cvar_95: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub anomaly_count: Option<usize>,
    pub latest_anomaly: bool,
    /// Sections that failed, as `section: error`.
    pub failures: Vec<String>,
}

impl SymbolSummary {
    pub fn from_result(result: &AnalyticsResult) -> Self {
        let risk = result.risk.value();
        let anomalies = result.anomalies.value();
        let rsi = result.indicators.value().and_then(|set| {
            set.iter()
                .find(|(name, _)| name.starts_with("rsi_"))
                .and_then(|(_, r)| r.latest())
        });
        Self {
            symbol: result.symbol.clone(),
            status: result.status(),
            last_close: result.price.map(|p| p.last_close),
            period_return: result.price.map(|p| p.period_return),
            rsi,
            signal: result.trading_signals.overall,
            confidence: result.trading_signals.confidence,
            volatility: risk.map(|r| r.metrics.volatility),
            regime: risk.map(|r| r.volatility.regime),
            var_95: risk.map(|r| r.metrics.var_95),
            cvar_95: risk.map(|r| r.metrics.cvar_95),
            max_drawdown: risk.map(|r| r.metrics.max_drawdown),
            sharpe_ratio: risk.and_then(|r| r.metrics.sharpe_ratio),
            anomaly_count: anomalies.map(|a| a.anomaly_count()),
            latest_anomaly: result.trading_signals.latest_anomaly,
            failures: result
                .failures()
                .into_iter()
                .map(|(section, err)| format!("{section}: {err}"))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub ok: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a OverallStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                OverallStatus::Ok => counts.ok += 1,
                OverallStatus::Degraded => counts.degraded += 1,
                OverallStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.ok + self.degraded + self.failed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

/// Summary of a set of symbols, renderable as Markdown or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub status: OverallStatus,
    pub symbols: Vec<SymbolSummary>,
    pub status_counts: StatusCounts,
    pub signal_counts: SignalCounts,
    /// Strongest correlations by absolute value.
    pub top_pairs: Vec<PairCorrelation>,
    pub average_correlation: Option<f64>,
    /// Portfolio parametric VaR at the reported confidence.
    pub portfolio_var: Option<f64>,
    pub portfolio_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    pub notes: Vec<String>,
}

impl MarketReport {
    pub fn from_portfolio(title: impl Into<String>, portfolio: &PortfolioResult, top_k: usize) -> Self {
        let symbols: Vec<SymbolSummary> = portfolio
            .symbols
            .iter()
            .filter_map(|s| portfolio.asset(s))
            .map(SymbolSummary::from_result)
            .collect();

        let mut signal_counts = SignalCounts::default();
        for row in &symbols {
            match row.signal {
                OverallSignal::Bullish => signal_counts.bullish += 1,
                OverallSignal::Bearish => signal_counts.bearish += 1,
                OverallSignal::Neutral => signal_counts.neutral += 1,
            }
        }

        let mut notes = Vec::new();
        let (top_pairs, average_correlation) = match portfolio.correlation.value() {
            Some(c) => {
                for ex in &c.excluded {
                    notes.push(format!("{} excluded from correlation: {}", ex.symbol, ex.reason));
                }
                (
                    c.strongest_pairs(top_k).into_iter().cloned().collect(),
                    c.average_correlation(),
                )
            }
            None => {
                if let Some(err) = portfolio.correlation.error() {
                    notes.push(format!("correlation unavailable: {err}"));
                }
                (Vec::new(), None)
            }
        };
        let risk = portfolio.risk.value();
        if let Some(err) = portfolio.risk.error() {
            notes.push(format!("portfolio risk unavailable: {err}"));
        }

        Self {
            title: title.into(),
            generated_at: Utc::now(),
            status: portfolio.status(),
            status_counts: StatusCounts::tally(symbols.iter().map(|s| &s.status)),
            signal_counts,
            symbols,
            top_pairs,
            average_correlation,
            portfolio_var: risk.map(|r| r.parametric_var),
            portfolio_confidence: risk.map(|r| r.confidence),
            cache: None,
            notes,
        }
    }

    pub fn with_cache_stats(mut self, stats: CacheStats) -> Self {
        self.cache = Some(stats);
        self
    }

    pub fn row(&self, symbol: &str) -> Option<&SymbolSummary> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        super::MarkdownReportGenerator.generate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_statuses() {
        let counts = StatusCounts::tally(&[
            OverallStatus::Ok,
            OverallStatus::Ok,
            OverallStatus::Degraded,
            OverallStatus::Failed,
        ]);
        assert_eq!(
            counts,
            StatusCounts {
                ok: 2,
                degraded: 1,
                failed: 1
            }
        );
        assert_eq!(counts.total(), 4);
    }
}
