//! Markdown report generator.

use super::MarketReport;

pub struct MarkdownReportGenerator;

impl MarkdownReportGenerator {
    pub fn generate(&self, report: &MarketReport) -> String {
        let counts = report.status_counts;
        let signals = report.signal_counts;
        let mut out = format!(
            "# {}\n\n\
Generated: {}\n\n\
## Summary\n\
- Status: {}\n\
- Symbols: {} ({} ok, {} degraded, {} failed)\n\
- Signals: {} bullish, {} bearish, {} neutral\n",
            report.title,
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.status.as_str(),
            counts.total(),
            counts.ok,
            counts.degraded,
            counts.failed,
            signals.bullish,
            signals.bearish,
            signals.neutral,
        );
        if let Some(avg) = report.average_correlation {
            out.push_str(&format!("- Average correlation: {avg:+.3}\n"));
        }
        if let (Some(var), Some(c)) = (report.portfolio_var, report.portfolio_confidence) {
            out.push_str(&format!(
                "- Portfolio VaR ({:.0}%): {:.2}%\n",
                c * 100.0,
                var * 100.0
            ));
        }

        if !report.symbols.is_empty() {
            out.push_str("\n## Symbols\n\n");
            out.push_str(
                "| Symbol | Status | Close | Return | RSI | Signal | Vol | Regime | VaR 95 | Max DD | Sharpe | Anomalies |\n",
            );
            out.push_str(
                "|--------|--------|-------|--------|-----|--------|-----|--------|--------|--------|--------|-----------|\n",
            );
            for row in &report.symbols {
                let anomalies = match row.anomaly_count {
                    Some(n) if row.latest_anomaly => format!("{n} (latest)"),
                    Some(n) => n.to_string(),
                    None => "-".to_string(),
                };
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                    row.symbol,
                    row.status.as_str(),
                    fmt_opt(row.last_close, |v| format!("{v:.2}")),
                    fmt_opt(row.period_return, pct_signed),
                    fmt_opt(row.rsi, |v| format!("{v:.1}")),
                    row.signal.as_str(),
                    fmt_opt(row.volatility, pct),
                    row.regime.map(|r| r.as_str()).unwrap_or("-"),
                    fmt_opt(row.var_95, pct),
                    fmt_opt(row.max_drawdown, pct),
                    fmt_opt(row.sharpe_ratio, |v| format!("{v:.2}")),
                    anomalies,
                ));
            }
        }

        if !report.top_pairs.is_empty() {
            out.push_str("\n## Top Correlated Pairs\n\n");
            out.push_str("| Pair | Correlation | p-value | Obs | Significant |\n");
            out.push_str("|------|-------------|---------|-----|-------------|\n");
            for pair in &report.top_pairs {
                out.push_str(&format!(
                    "| {} / {} | {:+.3} | {:.4} | {} | {} |\n",
                    pair.a,
                    pair.b,
                    pair.correlation,
                    pair.p_value,
                    pair.observations,
                    if pair.significant { "yes" } else { "no" },
                ));
            }
        }

        let failures: Vec<(&str, &String)> = report
            .symbols
            .iter()
            .flat_map(|row| row.failures.iter().map(move |f| (row.symbol.as_str(), f)))
            .collect();
        if !failures.is_empty() {
            out.push_str("\n## Failed Sections\n\n");
            for (symbol, failure) in failures {
                out.push_str(&format!("- {symbol}: {failure}\n"));
            }
        }

        if let Some(cache) = &report.cache {
            out.push_str(&format!(
                "\n## Cache\n\n\
- Hits: {}, joins: {}, misses: {}, evictions: {}\n\
- Hit rate: {:.1}%\n",
                cache.hits,
                cache.joins,
                cache.misses,
                cache.evictions,
                cache.hit_rate() * 100.0
            ));
        }

        if !report.notes.is_empty() {
            out.push_str("\n## Notes\n");
            for note in &report.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }

        out
    }
}

fn fmt_opt(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    match value {
        Some(v) if v.is_finite() => f(v),
        _ => "-".to_string(),
    }
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn pct_signed(v: f64) -> String {
    format!("{:+.2}%", v * 100.0)
}
