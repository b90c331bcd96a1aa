//! Content fingerprints: deterministic identification of inputs.
//!
//! - `ParamHash`: BLAKE3 of the canonical JSON of a parameter set. Two
//!   requests with identical parameters share cache entries.
//! - `DataVersion`: last bar timestamp + BLAKE3 over every bar. A newer bar
//!   for an asset produces a newer `as_of` and supersedes cached results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;
use crate::error::AnalyticsError;

/// Hash of a serializable parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamHash(pub String);

impl ParamHash {
    /// Hash the canonical JSON form of `params`.
    ///
    /// Struct fields serialize in declaration order and maps are `BTreeMap`s,
    /// so the JSON (and therefore the hash) is stable across runs.
    pub fn of<T: Serialize + ?Sized>(params: &T) -> Result<Self, AnalyticsError> {
        let json = serde_json::to_vec(params)
            .map_err(|e| AnalyticsError::component("fingerprint", e.to_string()))?;
        Ok(Self::from_bytes(&json))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 16 hex characters, for log lines and cache keys.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for ParamHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of the data a result was computed from.
///
/// Ordering is by `as_of` only; two versions with the same `as_of` but
/// different fingerprints are revisions of the same bar range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataVersion {
    pub as_of: DateTime<Utc>,
    pub bar_count: usize,
    pub fingerprint: String,
}

impl DataVersion {
    pub fn of(series: &PriceSeries) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(series.symbol().as_bytes());
        hasher.update(series.interval().as_str().as_bytes());
        for bar in series.bars() {
            hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
            if let (Some(bid), Some(ask)) = (bar.bid, bar.ask) {
                hasher.update(&bid.to_le_bytes());
                hasher.update(&ask.to_le_bytes());
            }
        }
        let as_of = series
            .last()
            .map(|b| b.timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self {
            as_of,
            bar_count: series.len(),
            fingerprint: hasher.finalize().to_hex().to_string(),
        }
    }

    /// Combine several versions (portfolio-level results) into one.
    ///
    /// Input order does not matter: versions are sorted by fingerprint first.
    pub fn combine(versions: &[DataVersion]) -> Self {
        let mut sorted: Vec<&DataVersion> = versions.iter().collect();
        sorted.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        let mut hasher = blake3::Hasher::new();
        for v in &sorted {
            hasher.update(v.fingerprint.as_bytes());
        }
        Self {
            as_of: versions
                .iter()
                .map(|v| v.as_of)
                .max()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            bar_count: versions.iter().map(|v| v.bar_count).sum(),
            fingerprint: hasher.finalize().to_hex().to_string(),
        }
    }

    pub fn short(&self) -> &str {
        &self.fingerprint[..self.fingerprint.len().min(16)]
    }
}

impl fmt::Display for DataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.short(), self.as_of.to_rfc3339())
    }
}
