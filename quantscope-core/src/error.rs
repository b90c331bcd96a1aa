//! Error taxonomy shared by every analytics component.
//!
//! `InvalidParameter` and `DataUnavailable` are terminal: the orchestrator
//! returns them before any computation starts. The remaining variants are
//! caught at the orchestrator boundary and recorded against the section that
//! produced them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by indicator, correlation, risk and anomaly computations.
///
/// `Clone` so a single-flight computation can hand the same failure to every
/// waiting caller; `Serialize` so failures can be embedded in result metadata.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsError {
    #[error("insufficient data for {context}: need {required} points, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    #[error("no data available for '{symbol}': {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{context} exceeded compute budget of {budget_ms} ms")]
    Timeout { context: String, budget_ms: u64 },

    #[error("{component} failed: {detail}")]
    ComponentFailure { component: String, detail: String },
}

impl AnalyticsError {
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn component(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ComponentFailure {
            component: component.into(),
            detail: detail.into(),
        }
    }

    /// Terminal errors abort a request before dispatch instead of being
    /// recorded against a single section.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::DataUnavailable { .. }
        )
    }

    /// Short machine-readable tag, matching the serde `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Timeout { .. } => "timeout",
            Self::ComponentFailure { .. } => "component_failure",
        }
    }
}

/// Reject a lookback period of zero.
pub fn require_period(name: &str, period: usize) -> Result<(), AnalyticsError> {
    if period == 0 {
        return Err(AnalyticsError::invalid(name, "period must be >= 1"));
    }
    Ok(())
}

/// Reject a confidence level outside the open interval (0, 1).
pub fn require_confidence(level: f64) -> Result<(), AnalyticsError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(AnalyticsError::invalid(
            "confidence_level",
            format!("{level} is outside (0, 1)"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(AnalyticsError::invalid("period", "negative").is_terminal());
        assert!(AnalyticsError::unavailable("SPY", "empty range").is_terminal());
        assert!(!AnalyticsError::insufficient("rsi", 15, 7).is_terminal());
        assert!(!AnalyticsError::component("anomaly", "boom").is_terminal());
        assert!(!AnalyticsError::Timeout {
            context: "lof".into(),
            budget_ms: 10
        }
        .is_terminal());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = AnalyticsError::insufficient("rsi_14", 15, 7);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "insufficient_data");
        assert_eq!(json["required"], 15);
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn display_mentions_counts() {
        let err = AnalyticsError::insufficient("rsi_14", 15, 7);
        let msg = err.to_string();
        assert!(msg.contains("15"));
        assert!(msg.contains("7"));
    }

    #[test]
    fn confidence_bounds() {
        assert!(require_confidence(0.95).is_ok());
        assert!(require_confidence(0.0).is_err());
        assert!(require_confidence(1.0).is_err());
        assert!(require_confidence(f64::NAN).is_err());
        assert!(require_period("rsi", 0).is_err());
        assert!(require_period("rsi", 1).is_ok());
    }
}
