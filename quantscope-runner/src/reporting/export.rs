//! Write a market report to disk as Markdown, JSON and a per-symbol CSV.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::reports::{MarketReport, SymbolSummary};

/// Files written by `export_report`.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
    pub summary_csv: PathBuf,
}

/// Flat CSV row; `None` becomes an empty field.
#[derive(Serialize)]
struct SummaryRow<'a> {
    symbol: &'a str,
    status: &'static str,
    last_close: Option<f64>,
    period_return: Option<f64>,
    rsi: Option<f64>,
    signal: &'static str,
    confidence: f64,
    volatility: Option<f64>,
    regime: Option<&'static str>,
    var_95: Option<f64>,
    cvar_95: Option<f64>,
    max_drawdown: Option<f64>,
    sharpe_ratio: Option<f64>,
    anomaly_count: Option<usize>,
    latest_anomaly: bool,
    failed_sections: usize,
}

impl<'a> From<&'a SymbolSummary> for SummaryRow<'a> {
    fn from(s: &'a SymbolSummary) -> Self {
        Self {
            symbol: &s.symbol,
            status: s.status.as_str(),
            last_close: s.last_close,
            period_return: s.period_return,
            rsi: s.rsi,
            signal: s.signal.as_str(),
            confidence: s.confidence,
            volatility: s.volatility,
            regime: s.regime.map(|r| r.as_str()),
            var_95: s.var_95,
            cvar_95: s.cvar_95,
            max_drawdown: s.max_drawdown,
            sharpe_ratio: s.sharpe_ratio,
            anomaly_count: s.anomaly_count,
            latest_anomaly: s.latest_anomaly,
            failed_sections: s.failures.len(),
        }
    }
}

pub fn export_report(output_dir: impl AsRef<Path>, report: &MarketReport) -> Result<ReportPaths> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

    let markdown = dir.join("report.md");
    std::fs::write(&markdown, report.to_markdown())
        .with_context(|| format!("Failed to write {}", markdown.display()))?;

    let json = dir.join("report.json");
    let body = report.to_json().context("Failed to serialize report")?;
    std::fs::write(&json, body).with_context(|| format!("Failed to write {}", json.display()))?;

    let summary_csv = dir.join("summary.csv");
    write_summary_csv(&summary_csv, &report.symbols)?;

    Ok(ReportPaths {
        markdown,
        json,
        summary_csv,
    })
}

fn write_summary_csv(path: &Path, rows: &[SymbolSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(SummaryRow::from(row))
            .with_context(|| format!("Failed to write row for {}", row.symbol))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::reports::{SignalCounts, StatusCounts};
    use crate::result::OverallStatus;
    use crate::signals::OverallSignal;
    use chrono::Utc;

    fn row(symbol: &str) -> SymbolSummary {
        SymbolSummary {
            symbol: symbol.into(),
            status: OverallStatus::Ok,
            last_close: Some(10.0),
            period_return: Some(0.1),
            rsi: None,
            signal: OverallSignal::Neutral,
            confidence: 0.0,
            volatility: Some(0.2),
            regime: None,
            var_95: Some(0.02),
            cvar_95: Some(0.03),
            max_drawdown: Some(0.05),
            sharpe_ratio: None,
            anomaly_count: Some(0),
            latest_anomaly: false,
            failures: Vec::new(),
        }
    }

    #[test]
    fn writes_all_three_files() {
        let report = MarketReport {
            title: "Test".into(),
            generated_at: Utc::now(),
            status: OverallStatus::Ok,
            symbols: vec![row("AAA"), row("BBB")],
            status_counts: StatusCounts {
                ok: 2,
                degraded: 0,
                failed: 0,
            },
            signal_counts: SignalCounts::default(),
            top_pairs: Vec::new(),
            average_correlation: None,
            portfolio_var: None,
            portfolio_confidence: None,
            cache: None,
            notes: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let paths = export_report(dir.path().join("out"), &report).unwrap();

        let md = std::fs::read_to_string(&paths.markdown).unwrap();
        assert!(md.starts_with("# Test"));

        let json: MarketReport =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json.symbols.len(), 2);

        let mut reader = csv::Reader::from_path(&paths.summary_csv).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "symbol");
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "BBB");
        // rsi is None
        assert_eq!(&records[0][4], "");
    }
}
