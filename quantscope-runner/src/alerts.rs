//! Threshold alerts on risk and anomaly results.
//!
//! Delivery is somebody else's problem: the engine hands finished `Alert`s
//! to an `AlertSink`. `LogSink` writes them to the tracing log and
//! `CollectingSink` keeps them in memory.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use quantscope_core::anomaly::AnomalyResult;
use quantscope_core::risk::RiskMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub rule: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: Alert);
}

/// Limits that raise an alert when exceeded. `None` disables a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRules {
    pub var_95: Option<f64>,
    pub var_99: Option<f64>,
    pub max_drawdown: Option<f64>,
    /// Annualized volatility.
    pub volatility: Option<f64>,
    /// Share of bars flagged by the ensemble.
    pub anomaly_rate: Option<f64>,
    /// Alert when the most recent bar is anomalous.
    pub latest_anomaly: bool,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            var_95: Some(0.05),
            var_99: Some(0.08),
            max_drawdown: Some(0.20),
            volatility: Some(0.40),
            anomaly_rate: Some(0.15),
            latest_anomaly: true,
        }
    }
}

impl AlertRules {
    pub fn check_risk(&self, symbol: &str, metrics: &RiskMetrics) -> Vec<Alert> {
        let checks = [
            ("var_95", self.var_95, metrics.var_95, Severity::Warning),
            ("var_99", self.var_99, metrics.var_99, Severity::Critical),
            ("max_drawdown", self.max_drawdown, metrics.max_drawdown, Severity::Warning),
            ("volatility", self.volatility, metrics.volatility, Severity::Warning),
        ];
        checks
            .into_iter()
            .filter_map(|(rule, limit, value, severity)| {
                let limit = limit?;
                (value > limit).then(|| Alert {
                    symbol: symbol.to_string(),
                    rule: rule.to_string(),
                    severity,
                    value,
                    threshold: limit,
                    message: format!("{symbol} {rule} {value:.4} exceeds {limit:.4}"),
                    raised_at: Utc::now(),
                })
            })
            .collect()
    }

    pub fn check_anomalies(&self, result: &AnomalyResult) -> Vec<Alert> {
        let symbol = &result.symbol;
        let mut alerts = Vec::new();
        if let Some(limit) = self.anomaly_rate {
            let rate = result.anomaly_rate();
            if rate > limit {
                alerts.push(Alert {
                    symbol: symbol.clone(),
                    rule: "anomaly_rate".into(),
                    severity: Severity::Warning,
                    value: rate,
                    threshold: limit,
                    message: format!("{symbol} anomaly rate {rate:.3} exceeds {limit:.3}"),
                    raised_at: Utc::now(),
                });
            }
        }
        if self.latest_anomaly && result.latest_is_anomalous() {
            let score = result.anomaly_scores.last().copied().unwrap_or(0.0);
            alerts.push(Alert {
                symbol: symbol.clone(),
                rule: "latest_anomaly".into(),
                severity: Severity::Warning,
                value: score,
                threshold: 0.0,
                message: format!("{symbol} latest bar is anomalous"),
                raised_at: Utc::now(),
            });
        }
        alerts
    }
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn deliver(&self, alert: Alert) {
        match alert.severity {
            Severity::Info => info!(symbol = %alert.symbol, rule = %alert.rule, "{}", alert.message),
            Severity::Warning | Severity::Critical => warn!(
                symbol = %alert.symbol,
                rule = %alert.rule,
                severity = ?alert.severity,
                "{}",
                alert.message
            ),
        }
    }
}

/// Keeps every alert in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlertSink for CollectingSink {
    fn deliver(&self, alert: Alert) {
        self.lock().push(alert);
    }
}
