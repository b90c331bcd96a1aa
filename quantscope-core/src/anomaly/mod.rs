//! Anomaly detection.
//!
//! `AnomalyDetector::detect` engineers a feature matrix from the series,
//! runs each configured strategy over the standardized rows, and merges
//! their flags with a `VotingRule`. Rule-based price, volume and pattern
//! detectors run alongside and are reported as `events`.
//!
//! Warm-up rows (incomplete features) are never flagged. A matrix with no
//! variation in any feature is reported as anomaly-free without consulting
//! the strategies.

pub mod dbscan;
pub mod features;
pub mod isolation_forest;
pub mod lof;
pub(crate) mod neighbors;
pub mod one_class;
pub mod registry;
pub mod rules;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::Deadline;
use crate::config::AnomalyConfig;
use crate::domain::PriceSeries;
use crate::error::AnalyticsError;
use crate::rng::RngHierarchy;
use crate::stats::quantile;

pub use features::FeatureMatrix;
pub use rules::{AnomalyEvent, AnomalyKind};

/// A scoring strategy over standardized feature rows.
pub trait AnomalyStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Score every row; higher is more anomalous.
    fn score(&self, rows: &[Vec<f64>], deadline: &Deadline) -> Result<StrategyOutput, AnalyticsError>;

    /// Parameters reported in `ModelInfo`.
    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutput {
    pub scores: Vec<f64>,
    pub flags: Vec<bool>,
    /// Score above which a row is flagged.
    pub threshold: f64,
}

impl StrategyOutput {
    /// Nothing flagged, all scores zero.
    pub fn quiet(n: usize) -> Self {
        Self {
            scores: vec![0.0; n],
            flags: vec![false; n],
            threshold: 0.0,
        }
    }

    /// Flag scores strictly above `threshold`.
    pub fn above(scores: Vec<f64>, threshold: f64) -> Self {
        let flags = scores.iter().map(|s| *s > threshold).collect();
        Self {
            scores,
            flags,
            threshold,
        }
    }

    pub fn flagged(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

/// Score at rank ceil(n · contamination) in descending order. Flagging
/// scores strictly above it marks at most that many rows, fewer on ties.
pub fn contamination_threshold(scores: &[f64], contamination: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let idx = (scores.len() as f64 * contamination).ceil() as usize;
    sorted[idx.min(scores.len() - 1)]
}

/// How per-strategy outputs merge into one verdict per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingRule {
    /// Flagged by at least one strategy.
    Any,
    /// Flagged by more than half of the strategies.
    Majority,
    /// Weighted sum of normalized scores reaches `weighted_threshold`.
    Weighted,
}

impl VotingRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingRule::Any => "any",
            VotingRule::Majority => "majority",
            VotingRule::Weighted => "weighted",
        }
    }
}

/// Per-strategy rescaling of raw scores to [0, 1]: the median row maps to
/// 0 and the flagging threshold to 1. A near miss therefore counts almost
/// as much as a flag while typical rows count nothing.
struct ScoreScale {
    baseline: f64,
    span: f64,
}

impl ScoreScale {
    fn of(output: &StrategyOutput) -> Self {
        let finite: Vec<f64> = output.scores.iter().copied().filter(|s| s.is_finite()).collect();
        let baseline = if finite.is_empty() { 0.0 } else { quantile(&finite, 0.5) };
        Self {
            baseline,
            span: output.threshold - baseline,
        }
    }

    /// Flagged rows score 1. Without a usable span the flags decide alone.
    fn normalized(&self, output: &StrategyOutput, i: usize) -> f64 {
        if output.flags[i] {
            return 1.0;
        }
        let score = output.scores.get(i).copied().unwrap_or(f64::NAN);
        if self.span > 0.0 && score.is_finite() {
            ((score - self.baseline) / self.span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Merge strategy outputs. Returns the verdict per row and its score in
/// [0, 1]: the share of strategies that flagged it for `Any` and
/// `Majority`, the weighted normalized score sum over the total weight for
/// `Weighted`.
pub fn combine(
    outputs: &[(String, StrategyOutput)],
    config: &AnomalyConfig,
) -> (Vec<bool>, Vec<f64>) {
    let n = outputs.first().map(|(_, o)| o.flags.len()).unwrap_or(0);
    let weighted = config.voting == VotingRule::Weighted;
    let weight = |name: &str| if weighted { config.weight_for(name) } else { 1.0 };
    let total = outputs
        .iter()
        .fold(0.0, |acc, (name, _)| acc + weight(name));

    let scales: Vec<ScoreScale> = outputs.iter().map(|(_, o)| ScoreScale::of(o)).collect();

    let mut verdicts = vec![false; n];
    let mut shares = vec![0.0; n];
    for i in 0..n {
        let votes = outputs.iter().filter(|(_, o)| o.flags[i]).count();
        let sum = outputs.iter().zip(&scales).fold(0.0, |acc, ((name, o), scale)| {
            let contribution = if weighted {
                scale.normalized(o, i)
            } else if o.flags[i] {
                1.0
            } else {
                0.0
            };
            acc + weight(name) * contribution
        });
        shares[i] = if total > 0.0 { sum / total } else { 0.0 };
        verdicts[i] = match config.voting {
            VotingRule::Any => votes > 0,
            VotingRule::Majority => 2 * votes > outputs.len(),
            VotingRule::Weighted => total > 0.0 && shares[i] >= config.weighted_threshold,
        };
    }
    (verdicts, shares)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub name: String,
    pub weight: f64,
    pub flagged: usize,
    pub threshold: f64,
    pub parameters: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub voting: VotingRule,
    pub contamination: f64,
    pub strategies: Vec<StrategySummary>,
    /// Rows the strategies were fitted on (complete features).
    pub fitted_rows: usize,
    /// Leading rows skipped for incomplete features.
    pub warmup_rows: usize,
    /// The feature matrix had no variation; strategies were not run.
    pub degenerate: bool,
}

/// Anomaly verdicts aligned 1:1 with the analyzed bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub symbol: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub anomalies: Vec<bool>,
    /// Weighted share of strategies that flagged each bar, in [0, 1].
    pub anomaly_scores: Vec<f64>,
    pub features_used: Vec<String>,
    pub model_info: ModelInfo,
    /// Price, volume and pattern rule hits.
    pub events: Vec<AnomalyEvent>,
}

impl AnomalyResult {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|a| **a).count()
    }

    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.anomalies
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.then_some(i))
            .collect()
    }

    pub fn anomaly_rate(&self) -> f64 {
        if self.anomalies.is_empty() {
            0.0
        } else {
            self.anomaly_count() as f64 / self.anomalies.len() as f64
        }
    }

    /// Whether the most recent bar is flagged by the ensemble or any rule.
    pub fn latest_is_anomalous(&self) -> bool {
        let Some(last) = self.anomalies.len().checked_sub(1) else {
            return false;
        };
        self.anomalies[last] || self.events.iter().any(|e| e.index == last)
    }

    pub fn events_of(&self, kind: AnomalyKind) -> impl Iterator<Item = &AnomalyEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

pub struct AnomalyDetector {
    config: AnomalyConfig,
    rng: RngHierarchy,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let rng = RngHierarchy::new(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn detect(
        &self,
        series: &PriceSeries,
        deadline: &Deadline,
    ) -> Result<AnomalyResult, AnalyticsError> {
        let cfg = &self.config;
        let symbol = series.symbol();
        let features = FeatureMatrix::build(series, cfg.feature_window);
        let valid = features.valid_rows();
        if valid.len() < cfg.min_observations {
            return Err(AnalyticsError::insufficient(
                format!("anomaly detection for {symbol}"),
                cfg.min_observations,
                valid.len(),
            ));
        }
        let rows = features.standardized(&valid);
        let degenerate = rows.iter().flatten().all(|v| *v == 0.0);

        let mut outputs: Vec<(String, StrategyOutput)> = Vec::with_capacity(cfg.strategies.len());
        let mut summaries = Vec::with_capacity(cfg.strategies.len());
        for name in &cfg.strategies {
            deadline.check("anomaly detection")?;
            let seed = self.rng.sub_seed(symbol, name, 0);
            let strategy = registry::build(name, cfg, seed)?;
            let output = if degenerate {
                StrategyOutput::quiet(rows.len())
            } else {
                strategy.score(&rows, deadline)?
            };
            summaries.push(StrategySummary {
                name: name.clone(),
                weight: match cfg.voting {
                    VotingRule::Weighted => cfg.weight_for(name),
                    _ => 1.0,
                },
                flagged: output.flagged(),
                threshold: output.threshold,
                parameters: strategy.parameters(),
            });
            outputs.push((name.clone(), output));
        }
        let (verdicts, shares) = combine(&outputs, cfg);

        let n = series.len();
        let mut anomalies = vec![false; n];
        let mut anomaly_scores = vec![0.0; n];
        for (k, &i) in valid.iter().enumerate() {
            anomalies[i] = verdicts[k];
            anomaly_scores[i] = shares[k];
        }

        let mut events = rules::price_anomalies(series, cfg.feature_window, cfg.price_z_threshold);
        events.extend(rules::volume_anomalies(
            series,
            cfg.feature_window,
            cfg.volume_multiple,
        ));
        events.extend(rules::pattern_anomalies(series, cfg, deadline)?);
        events.sort_by_key(|e| (e.index, e.kind as u8));

        let result = AnomalyResult {
            symbol: symbol.to_string(),
            timestamps: series.timestamps(),
            anomalies,
            anomaly_scores,
            features_used: features.names.clone(),
            model_info: ModelInfo {
                voting: cfg.voting,
                contamination: cfg.contamination,
                strategies: summaries,
                fitted_rows: valid.len(),
                warmup_rows: valid.first().copied().unwrap_or(n),
                degenerate,
            },
            events,
        };
        debug!(
            symbol,
            bars = n,
            flagged = result.anomaly_count(),
            events = result.events.len(),
            degenerate,
            "anomaly detection complete"
        );
        Ok(result)
    }
}
