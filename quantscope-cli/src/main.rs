//! QuantScope CLI: run analyses from the command line.
//!
//! Commands:
//! - `analyze`: indicators, risk, anomalies and a combined signal for one symbol
//! - `portfolio`: per-asset analysis plus correlation and component VaR
//! - `stress`: portfolio impact of per-symbol price shocks
//! - `report`: market report to stdout or to a directory (Markdown, JSON, CSV)
//! - `risk`: risk report at chosen confidence levels
//! - `anomalies`: ensemble anomaly detection over a trailing window
//! - `config`: print the effective configuration as TOML
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quantscope_core::anomaly::AnomalyResult;
use quantscope_core::data::{CsvProvider, DataProvider, SyntheticProvider};
use quantscope_core::risk::RiskReport;
use quantscope_core::AnalyticsConfig;
use quantscope_runner::{
    export_report, AlertRules, AnalysisOptions, AnalyticsEngine, AnalyticsResult, LogSink,
    PortfolioResult, StressTestResult,
};

#[derive(Parser)]
#[command(
    name = "quantscope",
    version,
    about = "QuantScope CLI: indicators, correlation, risk and anomaly analytics"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML config file. Defaults are used for missing sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory with one `<SYMBOL>.csv` per symbol.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a seeded synthetic random walk instead of market data.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Seed for synthetic data.
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    /// End of the analyzed range (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    end: Option<String>,

    /// Print results as JSON instead of a text summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

/// Per-request overrides for `analyze` and `portfolio`.
#[derive(Args)]
struct OptionArgs {
    /// Days of history to analyze instead of the configured lookback.
    #[arg(long)]
    lookback_days: Option<i64>,

    /// VaR confidence level (repeatable). Defaults to the configured levels.
    #[arg(long = "confidence")]
    confidence: Vec<f64>,

    /// Detect anomalies over only the most recent N bars.
    #[arg(long)]
    anomaly_window: Option<usize>,
}

impl OptionArgs {
    fn into_options(self) -> AnalysisOptions {
        AnalysisOptions {
            lookback_days: self.lookback_days,
            confidence_levels: (!self.confidence.is_empty()).then_some(self.confidence),
            anomaly_window: self.anomaly_window,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one symbol.
    Analyze {
        symbol: String,

        /// Log threshold alerts for the result.
        #[arg(long, default_value_t = false)]
        alerts: bool,

        #[command(flatten)]
        options: OptionArgs,
    },
    /// Analyze several symbols as a portfolio.
    Portfolio {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Portfolio weight as SYMBOL=WEIGHT (repeatable). Equal weights when omitted.
        #[arg(long = "weight", value_parser = parse_symbol_value)]
        weights: Vec<(String, f64)>,

        #[command(flatten)]
        options: OptionArgs,
    },
    /// Apply price shocks to a portfolio and report the impact.
    Stress {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Portfolio weight as SYMBOL=WEIGHT (repeatable). Equal weights when omitted.
        #[arg(long = "weight", value_parser = parse_symbol_value)]
        weights: Vec<(String, f64)>,

        /// Fractional price shock as SYMBOL=SHOCK, e.g. AAPL=-0.2 (repeatable).
        #[arg(long = "shock", value_parser = parse_symbol_value)]
        shocks: Vec<(String, f64)>,

        /// Total portfolio value the weights split.
        #[arg(long, default_value_t = 1_000_000.0)]
        value: f64,
    },
    /// Build a market report over several symbols.
    Report {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Write report.md, report.json and summary.csv here instead of printing.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Risk metrics for one symbol.
    Risk {
        symbol: String,

        /// Confidence level (repeatable). Defaults to the configured levels.
        #[arg(long = "confidence")]
        confidence: Vec<f64>,
    },
    /// Anomalies for one symbol.
    Anomalies {
        symbol: String,

        /// Only analyze the most recent N bars.
        #[arg(long)]
        window: Option<usize>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.source)?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Analyze {
            symbol,
            alerts,
            options,
        } => {
            let mut engine = build_engine(&cli.source, config)?;
            if alerts {
                engine = engine.with_alerts(AlertRules::default(), Arc::new(LogSink));
            }
            let result = engine.analyze_single_asset(&symbol, &options.into_options())?;
            if cli.source.json {
                print_json(&result)
            } else {
                print_asset(&result);
                Ok(())
            }
        }
        Commands::Portfolio {
            symbols,
            weights,
            options,
        } => {
            let engine = build_engine(&cli.source, config)?;
            let weights: Option<BTreeMap<String, f64>> =
                (!weights.is_empty()).then(|| weights.into_iter().collect());
            let result =
                engine.analyze_portfolio(&symbols, weights.as_ref(), &options.into_options())?;
            if cli.source.json {
                print_json(&result)
            } else {
                print_portfolio(&result);
                Ok(())
            }
        }
        Commands::Stress {
            symbols,
            weights,
            shocks,
            value,
        } => {
            let engine = build_engine(&cli.source, config)?;
            let weights: Option<BTreeMap<String, f64>> =
                (!weights.is_empty()).then(|| weights.into_iter().collect());
            let shocks: BTreeMap<String, f64> = shocks.into_iter().collect();
            let result = engine.stress_test(&symbols, weights.as_ref(), &shocks, value)?;
            if cli.source.json {
                print_json(&result)
            } else {
                print_stress(&result);
                Ok(())
            }
        }
        Commands::Report { symbols, out } => {
            let engine = build_engine(&cli.source, config)?;
            let report = engine.generate_report(&symbols)?;
            match out {
                Some(dir) => {
                    let paths = export_report(&dir, &report)?;
                    info!(dir = %dir.display(), symbols = report.symbols.len(), "report exported");
                    println!("Report written to:");
                    println!("  {}", paths.markdown.display());
                    println!("  {}", paths.json.display());
                    println!("  {}", paths.summary_csv.display());
                    Ok(())
                }
                None if cli.source.json => print_json(&report),
                None => {
                    print!("{}", report.to_markdown());
                    Ok(())
                }
            }
        }
        Commands::Risk { symbol, confidence } => {
            let levels = if confidence.is_empty() {
                config.risk.confidence_levels.clone()
            } else {
                confidence
            };
            let engine = build_engine(&cli.source, config)?;
            let report = engine.get_risk_metrics(&symbol, &levels)?;
            if cli.source.json {
                print_json(&report)
            } else {
                print_risk(&report);
                Ok(())
            }
        }
        Commands::Anomalies { symbol, window } => {
            let engine = build_engine(&cli.source, config)?;
            let result = engine.get_anomalies(&symbol, window)?;
            if cli.source.json {
                print_json(&result)
            } else {
                print_anomalies(&result);
                Ok(())
            }
        }
    }
}

fn load_config(args: &SourceArgs) -> Result<AnalyticsConfig> {
    let config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_engine(args: &SourceArgs, config: AnalyticsConfig) -> Result<AnalyticsEngine> {
    if args.data_dir.is_some() && args.synthetic {
        bail!("--data-dir and --synthetic are mutually exclusive");
    }
    let provider: Arc<dyn DataProvider> = match &args.data_dir {
        Some(dir) => {
            if !dir.is_dir() {
                bail!("data directory does not exist: {}", dir.display());
            }
            Arc::new(CsvProvider::new(dir).with_interval(config.engine.interval))
        }
        None if args.synthetic => Arc::new(SyntheticProvider::new(args.seed)),
        None => bail!("one of --data-dir or --synthetic is required"),
    };

    let mut engine = AnalyticsEngine::new(config, provider)?;
    if let Some(end) = &args.end {
        engine = engine.with_end(parse_end(end)?);
    }
    Ok(engine)
}

fn parse_end(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid --end date '{s}', expected YYYY-MM-DD"))?;
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        bail!("invalid --end date '{s}'");
    };
    Ok(Utc.from_utc_datetime(&midnight))
}

fn parse_symbol_value(s: &str) -> Result<(String, f64), String> {
    let (symbol, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=VALUE, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{value}' for {symbol}"))?;
    Ok((symbol.trim().to_string(), value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn print_asset(result: &AnalyticsResult) {
    println!();
    println!("=== {} ===", result.symbol);
    println!("Status:         {}", result.status().as_str());
    println!(
        "Bars:           {} ({:?})",
        result.metadata.bars, result.metadata.data_source
    );
    if let Some(price) = &result.price {
        println!(
            "Last Close:     {:.2} ({:+.2}% over range)",
            price.last_close,
            price.period_return * 100.0
        );
    }

    let signals = &result.trading_signals;
    println!(
        "Signal:         {} (score {:+.2}, confidence {:.2})",
        signals.overall.as_str(),
        signals.score,
        signals.confidence
    );
    for vote in &signals.votes {
        println!("  {:<20} {:?}", vote.source, vote.reading);
    }

    if let Some(risk) = result.risk.value() {
        println!();
        println!("--- Risk ---");
        print_risk_metrics(risk);
    }
    if let Some(anomalies) = result.anomalies.value() {
        println!();
        println!("--- Anomalies ---");
        println!(
            "Flagged:        {} of {} bars ({})",
            anomalies.anomaly_count(),
            anomalies.anomalies.len(),
            pct(anomalies.anomaly_rate())
        );
        println!("Latest Bar:     {}", if anomalies.latest_is_anomalous() { "ANOMALOUS" } else { "normal" });
    }

    let failures = result.failures();
    if !failures.is_empty() {
        println!();
        for (section, err) in failures {
            println!("WARNING: {section} failed: {err}");
        }
    }
    for note in &signals.notes {
        println!("NOTE: {note}");
    }
    println!();
}

fn print_risk_metrics(report: &RiskReport) {
    let m = &report.metrics;
    println!("Volatility:     {} ({})", pct(m.volatility), report.volatility.regime.as_str());
    println!("VaR 95 / 99:    {} / {}", pct(m.var_95), pct(m.var_99));
    println!("CVaR 95 / 99:   {} / {}", pct(m.cvar_95), pct(m.cvar_99));
    println!("Max Drawdown:   {}", pct(m.max_drawdown));
    match m.sharpe_ratio {
        Some(s) => println!("Sharpe:         {s:.3}"),
        None => println!("Sharpe:         undefined"),
    }
    if let Some(s) = m.sortino_ratio {
        println!("Sortino:        {s:.3}");
    }
    if let Some(b) = m.beta {
        println!("Beta:           {b:.3}");
    }
}

fn print_risk(report: &RiskReport) {
    println!();
    println!("=== Risk: {} ===", report.symbol);
    println!("Observations:   {}", report.observations);
    print_risk_metrics(report);
    println!();
    println!("{:<12} {:<12} {:>10} {:>10}", "Confidence", "Method", "VaR", "CVaR");
    println!("{}", "-".repeat(47));
    for e in &report.var_estimates {
        println!(
            "{:<12} {:<12} {:>10} {:>10}",
            format!("{:.1}%", e.confidence * 100.0),
            e.method.as_str(),
            pct(e.var),
            pct(e.cvar)
        );
    }
    for warn in &report.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

fn print_anomalies(result: &AnomalyResult) {
    println!();
    println!("=== Anomalies: {} ===", result.symbol);
    println!(
        "Voting:         {} over {} strategies",
        result.model_info.voting.as_str(),
        result.model_info.strategies.len()
    );
    println!(
        "Flagged:        {} of {} bars ({})",
        result.anomaly_count(),
        result.anomalies.len(),
        pct(result.anomaly_rate())
    );
    if result.model_info.degenerate {
        println!("NOTE: degenerate input, nothing flagged");
    }
    for i in result.anomaly_indices() {
        let when = result
            .timestamps
            .get(i)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let score = result.anomaly_scores.get(i).copied().unwrap_or(f64::NAN);
        println!("  {when:<18} score {score:.3}");
    }
    if !result.events.is_empty() {
        println!();
        println!("{:<18} {:<8} {:>8}", "Event", "Kind", "Score");
        for e in &result.events {
            println!(
                "{:<18} {:<8} {:>8.2}",
                e.timestamp.format("%Y-%m-%d %H:%M"),
                format!("{:?}", e.kind),
                e.score
            );
        }
    }
    println!();
}

fn print_stress(result: &StressTestResult) {
    println!();
    println!("=== Stress Test ===");
    println!("Original value: {:.2}", result.original_value);
    println!("Stressed value: {:.2}", result.stressed_value);
    println!(
        "Impact:         {:+.2} ({})",
        result.total_impact,
        pct(result.impact_percentage)
    );
    println!();
    for i in &result.impacts {
        println!(
            "  {:<8} shock {:>8}  {:>14.2} -> {:>14.2}  ({:+.2})",
            i.symbol,
            pct(i.shock),
            i.original_value,
            i.shocked_value,
            i.impact
        );
    }
    println!();
}

fn print_portfolio(result: &PortfolioResult) {
    println!();
    println!("=== Portfolio ({} assets) ===", result.symbols.len());
    println!("Status:         {}", result.status().as_str());
    println!();
    println!("{:<8} {:<10} {:<8} {:>10} {:>10}", "Symbol", "Status", "Signal", "Vol", "VaR 95");
    println!("{}", "-".repeat(50));
    for symbol in &result.symbols {
        let Some(asset) = result.asset(symbol) else {
            continue;
        };
        let risk = asset.risk.value();
        println!(
            "{:<8} {:<10} {:<8} {:>10} {:>10}",
            symbol,
            asset.status().as_str(),
            asset.trading_signals.overall.as_str(),
            risk.map(|r| pct(r.metrics.volatility)).unwrap_or_else(|| "-".into()),
            risk.map(|r| pct(r.metrics.var_95)).unwrap_or_else(|| "-".into()),
        );
    }

    if let Some(corr) = result.correlation.value() {
        println!();
        println!("--- Strongest Correlations ---");
        for pair in corr.strongest_pairs(5) {
            println!(
                "  {} / {}: {:+.3} (p = {:.4}{})",
                pair.a,
                pair.b,
                pair.correlation,
                pair.p_value,
                if pair.significant { ", significant" } else { "" }
            );
        }
    } else if let Some(err) = result.correlation.error() {
        println!("WARNING: correlation failed: {err}");
    }

    if let Some(risk) = result.risk.value() {
        println!();
        println!("--- Portfolio Risk ({:.0}%) ---", risk.confidence * 100.0);
        println!("Parametric VaR: {}", pct(risk.parametric_var));
        println!("Historical VaR: {} (CVaR {})", pct(risk.historical_var), pct(risk.historical_cvar));
        for c in &risk.components {
            println!(
                "  {:<8} weight {:>6.1}%  component VaR {:>8}  share {:>6.1}%",
                c.symbol,
                c.weight * 100.0,
                pct(c.component_var),
                c.contribution * 100.0
            );
        }
    } else if let Some(err) = result.risk.error() {
        println!("WARNING: portfolio risk failed: {err}");
    }
    println!();
}
