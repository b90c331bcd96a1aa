//! Trading-signal synthesis.
//!
//! Each signal-producing indicator (RSI, MACD, Bollinger, Stochastic) casts
//! one vote from its reading at the latest bar. The mean bias decides the
//! overall direction; the volatility regime and a flagged latest bar only
//! lower the confidence, never flip the direction.

use serde::{Deserialize, Serialize};

use quantscope_core::anomaly::AnomalyResult;
use quantscope_core::indicators::{IndicatorSet, SignalKind};
use quantscope_core::risk::{RiskReport, VolatilityRegime};

/// Mean bias at or beyond which the overall signal is directional.
pub const DIRECTION_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl OverallSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallSignal::Bullish => "bullish",
            OverallSignal::Bearish => "bearish",
            OverallSignal::Neutral => "neutral",
        }
    }
}

/// One indicator's reading at the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalVote {
    pub source: String,
    pub reading: SignalKind,
    pub bias: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignals {
    pub overall: OverallSignal,
    /// Mean vote bias in [-1, 1].
    pub score: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub votes: Vec<SignalVote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_regime: Option<VolatilityRegime>,
    pub latest_anomaly: bool,
    pub notes: Vec<String>,
}

impl Default for TradingSignals {
    fn default() -> Self {
        Self {
            overall: OverallSignal::Neutral,
            score: 0.0,
            confidence: 0.0,
            votes: Vec::new(),
            volatility_regime: None,
            latest_anomaly: false,
            notes: Vec::new(),
        }
    }
}

/// Combine whatever sections succeeded into one signal.
///
/// `sources` names the indicators allowed to vote; indicators missing from
/// the set, or without enough data, abstain.
pub fn synthesize(
    indicators: Option<&IndicatorSet>,
    sources: &[&str],
    risk: Option<&RiskReport>,
    anomalies: Option<&AnomalyResult>,
) -> TradingSignals {
    let mut signals = TradingSignals::default();

    if let Some(set) = indicators {
        for source in sources {
            let Some(result) = set.get(*source) else { continue };
            if !result.is_ok() {
                continue;
            }
            if let Some(reading) = result.latest_signal() {
                signals.votes.push(SignalVote {
                    source: source.to_string(),
                    reading,
                    bias: reading.bias(),
                });
            }
        }
    }

    if signals.votes.is_empty() {
        signals.notes.push("no indicator readings available".into());
        return with_context(signals, risk, anomalies);
    }

    let total: i32 = signals.votes.iter().map(|v| i32::from(v.bias)).sum();
    signals.score = total as f64 / signals.votes.len() as f64;
    signals.overall = if signals.score >= DIRECTION_THRESHOLD {
        OverallSignal::Bullish
    } else if signals.score <= -DIRECTION_THRESHOLD {
        OverallSignal::Bearish
    } else {
        OverallSignal::Neutral
    };
    signals.confidence = signals.score.abs();
    with_context(signals, risk, anomalies)
}

fn with_context(
    mut signals: TradingSignals,
    risk: Option<&RiskReport>,
    anomalies: Option<&AnomalyResult>,
) -> TradingSignals {
    if let Some(report) = risk {
        let regime = report.volatility.regime;
        signals.volatility_regime = Some(regime);
        if matches!(regime, VolatilityRegime::High | VolatilityRegime::Extreme) {
            signals.confidence *= 0.5;
            signals
                .notes
                .push(format!("{} volatility regime", regime.as_str()));
        }
    }
    if let Some(result) = anomalies {
        signals.latest_anomaly = result.latest_is_anomalous();
        if signals.latest_anomaly {
            signals.confidence *= 0.5;
            signals.notes.push("latest bar flagged as anomalous".into());
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantscope_core::indicators::IndicatorResult;

    fn reading(name: &str, signal: SignalKind) -> (String, IndicatorResult) {
        (
            name.to_string(),
            IndicatorResult::new(name, vec![1.0, 2.0]).with_signals(vec![SignalKind::Neutral, signal]),
        )
    }

    const SOURCES: [&str; 4] = ["rsi_14", "macd_12_26_9", "bollinger_20_2", "stochastic_14_3"];

    #[test]
    fn majority_oversold_is_bullish() {
        let set: IndicatorSet = [
            reading("rsi_14", SignalKind::Oversold),
            reading("macd_12_26_9", SignalKind::BullishCrossover),
            reading("bollinger_20_2", SignalKind::Neutral),
            reading("stochastic_14_3", SignalKind::Oversold),
        ]
        .into_iter()
        .collect();
        let s = synthesize(Some(&set), &SOURCES, None, None);
        assert_eq!(s.overall, OverallSignal::Bullish);
        assert!((s.score - 0.75).abs() < 1e-12);
        assert!((s.confidence - 0.75).abs() < 1e-12);
        assert_eq!(s.votes.len(), 4);
    }

    #[test]
    fn mixed_readings_are_neutral() {
        let set: IndicatorSet = [
            reading("rsi_14", SignalKind::Overbought),
            reading("stochastic_14_3", SignalKind::Oversold),
        ]
        .into_iter()
        .collect();
        let s = synthesize(Some(&set), &SOURCES, None, None);
        assert_eq!(s.overall, OverallSignal::Neutral);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn insufficient_indicators_abstain() {
        let set: IndicatorSet = [
            reading("rsi_14", SignalKind::Overbought),
            ("macd_12_26_9".to_string(), IndicatorResult::insufficient("macd_12_26_9", 5, 35)),
        ]
        .into_iter()
        .collect();
        let s = synthesize(Some(&set), &SOURCES, None, None);
        assert_eq!(s.votes.len(), 1);
        assert_eq!(s.overall, OverallSignal::Bearish);
    }

    #[test]
    fn nothing_to_vote_on() {
        let s = synthesize(None, &SOURCES, None, None);
        assert_eq!(s.overall, OverallSignal::Neutral);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.notes, vec!["no indicator readings available".to_string()]);
    }
}
