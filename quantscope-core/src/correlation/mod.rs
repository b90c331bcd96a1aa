//! Cross-asset correlation.
//!
//! Each pair is inner-joined on timestamp before correlating, so every pair
//! carries its own observation count. Pairs below `min_periods` are NaN in
//! the matrix and never significant. The diagonal is always 1.0.

pub mod rolling;
pub mod sector;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::budget::Deadline;
use crate::config::CorrelationConfig;
use crate::data::align_inner;
use crate::domain::{log_returns, PriceSeries};
use crate::error::AnalyticsError;
use crate::stats::{correlation_p_value, pearson};

pub use rolling::{PairRegime, RegimeChange, RollingCorrelation};
pub use sector::{SectorMap, SectorSummary};

/// What gets correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationBasis {
    LogReturns,
    Prices,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub a: String,
    pub b: String,
    #[serde(with = "crate::serde_nan::scalar")]
    pub correlation: f64,
    #[serde(with = "crate::serde_nan::scalar")]
    pub p_value: f64,
    pub observations: usize,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedAsset {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub symbols: Vec<String>,
    pub basis: CorrelationBasis,
    /// Square, symmetric, `symbols.len()` on a side.
    #[serde(with = "crate::serde_nan::matrix")]
    pub matrix: Vec<Vec<f64>>,
    /// Every off-diagonal pair, `a` before `b` in `symbols` order.
    pub pairs: Vec<PairCorrelation>,
    pub significant_pairs: Vec<PairCorrelation>,
    pub excluded: Vec<ExcludedAsset>,
    #[serde(default)]
    pub regimes: Vec<PairRegime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sectors: Option<SectorSummary>,
}

impl CorrelationResult {
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Matrix entry for two symbols (NaN if undefined).
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.matrix[self.index_of(a)?][self.index_of(b)?])
    }

    /// The `k` defined pairs with the largest |r|, strongest first.
    pub fn strongest_pairs(&self, k: usize) -> Vec<&PairCorrelation> {
        let mut defined: Vec<&PairCorrelation> = self
            .pairs
            .iter()
            .filter(|p| !p.correlation.is_nan())
            .collect();
        defined.sort_by(|x, y| {
            y.correlation
                .abs()
                .total_cmp(&x.correlation.abs())
                .then_with(|| x.a.cmp(&y.a))
                .then_with(|| x.b.cmp(&y.b))
        });
        defined.truncate(k);
        defined
    }

    /// Mean of the defined off-diagonal correlations.
    pub fn average_correlation(&self) -> Option<f64> {
        let defined: Vec<f64> = self
            .pairs
            .iter()
            .map(|p| p.correlation)
            .filter(|r| !r.is_nan())
            .collect();
        if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    config: CorrelationConfig,
}

impl CorrelationAnalyzer {
    pub fn new(config: CorrelationConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    pub fn basis(&self) -> CorrelationBasis {
        if self.config.use_returns {
            CorrelationBasis::LogReturns
        } else {
            CorrelationBasis::Prices
        }
    }

    /// Matrix, significance and per-pair regime annotations.
    pub fn analyze(
        &self,
        series: &[PriceSeries],
        deadline: &Deadline,
    ) -> Result<CorrelationResult, AnalyticsError> {
        self.analyze_inner(series, None, deadline)
    }

    /// As `analyze`, plus intra/inter sector means from `sectors`.
    pub fn analyze_with_sectors(
        &self,
        series: &[PriceSeries],
        sectors: &SectorMap,
        deadline: &Deadline,
    ) -> Result<CorrelationResult, AnalyticsError> {
        self.analyze_inner(series, Some(sectors), deadline)
    }

    fn analyze_inner(
        &self,
        series: &[PriceSeries],
        sectors: Option<&SectorMap>,
        deadline: &Deadline,
    ) -> Result<CorrelationResult, AnalyticsError> {
        let mut seen = BTreeSet::new();
        for s in series {
            if !seen.insert(s.symbol()) {
                return Err(AnalyticsError::invalid(
                    "symbols",
                    format!("duplicate symbol '{}'", s.symbol()),
                ));
            }
        }
        if series.len() < 2 {
            return Err(AnalyticsError::insufficient("correlation assets", 2, series.len()));
        }

        let (kept, excluded) = self.partition_overlapping(series);
        if kept.len() < 2 {
            return Err(AnalyticsError::insufficient(
                "correlation assets with overlapping history",
                2,
                kept.len(),
            ));
        }

        let n = kept.len();
        let symbols: Vec<String> = kept.iter().map(|s| s.symbol().to_string()).collect();
        let mut matrix = vec![vec![f64::NAN; n]; n];
        let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
        let mut regimes = Vec::new();

        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                deadline.check("correlation")?;
                let (x, y) = self.paired_values(kept[i], kept[j]);
                let pair = self.pair_stat(&symbols[i], &symbols[j], &x, &y);
                matrix[i][j] = pair.correlation;
                matrix[j][i] = pair.correlation;

                if x.len() > self.config.rolling_window {
                    let rolling = rolling::rolling_pair(
                        &symbols[i],
                        &symbols[j],
                        &x,
                        &y,
                        None,
                        &self.config,
                        deadline,
                    )?;
                    regimes.push(rolling.summary());
                }
                pairs.push(pair);
            }
        }

        let significant_pairs: Vec<PairCorrelation> =
            pairs.iter().filter(|p| p.significant).cloned().collect();
        debug!(
            assets = n,
            pairs = pairs.len(),
            significant = significant_pairs.len(),
            excluded = excluded.len(),
            "correlation matrix computed"
        );

        let mut result = CorrelationResult {
            symbols,
            basis: self.basis(),
            matrix,
            pairs,
            significant_pairs,
            excluded,
            regimes,
            sectors: None,
        };
        if let Some(map) = sectors {
            result.sectors = Some(sector::summarize(&result, map));
        }
        Ok(result)
    }

    /// Rolling correlation of one pair with regime-change flags.
    pub fn rolling(
        &self,
        a: &PriceSeries,
        b: &PriceSeries,
        deadline: &Deadline,
    ) -> Result<RollingCorrelation, AnalyticsError> {
        let panel = align_inner(&[a, b]);
        let (x, y, ts) = if self.config.use_returns {
            let ra = log_returns(&panel.closes[0]);
            let rb = log_returns(&panel.closes[1]);
            (ra, rb, panel.timestamps.get(1..).unwrap_or_default().to_vec())
        } else {
            (panel.closes[0].clone(), panel.closes[1].clone(), panel.timestamps)
        };
        let (x, y, ts) = drop_nan_rows(x, y, ts);
        if x.len() < self.config.rolling_window {
            return Err(AnalyticsError::insufficient(
                format!("rolling correlation {}/{}", a.symbol(), b.symbol()),
                self.config.rolling_window,
                x.len(),
            ));
        }
        rolling::rolling_pair(a.symbol(), b.symbol(), &x, &y, Some(ts), &self.config, deadline)
    }

    /// Split assets into those overlapping at least one other asset and the
    /// rest, which are excluded with a warning.
    fn partition_overlapping<'a>(
        &self,
        series: &'a [PriceSeries],
    ) -> (Vec<&'a PriceSeries>, Vec<ExcludedAsset>) {
        let mut kept = Vec::new();
        let mut excluded = Vec::new();
        for (i, s) in series.iter().enumerate() {
            let reason = if s.len() < 2 {
                Some(format!("only {} bar(s)", s.len()))
            } else {
                let overlaps = series
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && align_inner(&[s, other]).len() >= 2);
                (!overlaps).then(|| "no timestamp overlap with any other asset".to_string())
            };
            match reason {
                Some(reason) => {
                    warn!(symbol = s.symbol(), %reason, "excluding asset from correlation");
                    excluded.push(ExcludedAsset {
                        symbol: s.symbol().to_string(),
                        reason,
                    });
                }
                None => kept.push(s),
            }
        }
        (kept, excluded)
    }

    /// Inner-joined, NaN-free values for one pair on the configured basis.
    fn paired_values(&self, a: &PriceSeries, b: &PriceSeries) -> (Vec<f64>, Vec<f64>) {
        let panel = align_inner(&[a, b]);
        let (x, y) = if self.config.use_returns {
            (log_returns(&panel.closes[0]), log_returns(&panel.closes[1]))
        } else {
            (panel.closes[0].clone(), panel.closes[1].clone())
        };
        let (x, y, _) = drop_nan_rows(x, y, Vec::<()>::new());
        (x, y)
    }

    fn pair_stat(&self, a: &str, b: &str, x: &[f64], y: &[f64]) -> PairCorrelation {
        let observations = x.len();
        if observations < self.config.min_periods {
            return PairCorrelation {
                a: a.to_string(),
                b: b.to_string(),
                correlation: f64::NAN,
                p_value: f64::NAN,
                observations,
                significant: false,
            };
        }
        match pearson(x, y) {
            Some(r) => {
                let p_value = correlation_p_value(r, observations);
                PairCorrelation {
                    a: a.to_string(),
                    b: b.to_string(),
                    correlation: r,
                    p_value,
                    observations,
                    significant: p_value < self.config.p_value_threshold,
                }
            }
            None => PairCorrelation {
                a: a.to_string(),
                b: b.to_string(),
                correlation: f64::NAN,
                p_value: f64::NAN,
                observations,
                significant: false,
            },
        }
    }
}

/// Drop rows where either side is NaN. `ts` may be empty when timestamps
/// are not needed.
fn drop_nan_rows<T: Clone>(
    x: Vec<f64>,
    y: Vec<f64>,
    ts: Vec<T>,
) -> (Vec<f64>, Vec<f64>, Vec<T>) {
    let keep_ts = ts.len() == x.len();
    let mut ox = Vec::with_capacity(x.len());
    let mut oy = Vec::with_capacity(y.len());
    let mut ot = Vec::new();
    for i in 0..x.len().min(y.len()) {
        if x[i].is_nan() || y[i].is_nan() {
            continue;
        }
        ox.push(x[i]);
        oy.push(y[i]);
        if keep_ts {
            ot.push(ts[i].clone());
        }
    }
    (ox, oy, ot)
}

/// Correlation matrix as a name-keyed map, for reporting.
pub fn matrix_map(result: &CorrelationResult) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut out = BTreeMap::new();
    for (i, a) in result.symbols.iter().enumerate() {
        let row: BTreeMap<String, f64> = result
            .symbols
            .iter()
            .enumerate()
            .map(|(j, b)| (b.clone(), result.matrix[i][j]))
            .collect();
        out.insert(a.clone(), row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Interval};
    use crate::rng::{standard_normal, RngHierarchy};
    use chrono::{Duration, TimeZone, Utc};

    fn walk(symbol: &str, returns: &[f64]) -> PriceSeries {
        let mut closes = vec![100.0];
        for r in returns {
            let last = closes[closes.len() - 1];
            closes.push(last * r.exp());
        }
        PriceSeries::from_closes(symbol, &closes)
    }

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut rng = RngHierarchy::new(seed).rng_for("test", "noise", 0);
        (0..n).map(|_| 0.01 * standard_normal(&mut rng)).collect()
    }

    fn analyzer() -> CorrelationAnalyzer {
        CorrelationAnalyzer::new(CorrelationConfig::default()).unwrap()
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let base = noise(1, 120);
        let other = noise(2, 120);
        let mixed: Vec<f64> = base.iter().zip(&other).map(|(a, b)| 0.7 * a + 0.3 * b).collect();
        let series = vec![walk("A", &base), walk("B", &mixed), walk("C", &other)];

        let r = analyzer().analyze(&series, &Deadline::unbounded()).unwrap();

        for i in 0..3 {
            assert_eq!(r.matrix[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(r.matrix[i][j].to_bits(), r.matrix[j][i].to_bits());
            }
        }
        assert_eq!(r.pairs.len(), 3);
        let ab = r.get("A", "B").unwrap();
        assert!(ab > 0.8, "{ab}");
        assert!(r.significant_pairs.iter().any(|p| p.a == "A" && p.b == "B"));
        assert_eq!(r.strongest_pairs(1)[0].b, "B");
    }

    #[test]
    fn short_overlap_is_nan_and_not_significant() {
        let series = vec![walk("A", &noise(1, 10)), walk("B", &noise(2, 10))];
        let r = analyzer().analyze(&series, &Deadline::unbounded()).unwrap();
        assert!(r.get("A", "B").unwrap().is_nan());
        assert!(r.significant_pairs.is_empty());
        assert_eq!(r.pairs[0].observations, 10);
        assert!(r.strongest_pairs(5).is_empty());
    }

    #[test]
    fn pair_uses_only_overlapping_returns() {
        let a = walk("A", &noise(1, 60));
        let b = walk("B", &noise(2, 60)).tail(31);
        let r = analyzer().analyze(&[a, b], &Deadline::unbounded()).unwrap();
        assert_eq!(r.pairs[0].observations, 30);
        assert!(r.get("A", "B").unwrap().is_finite());
    }

    #[test]
    fn disjoint_asset_is_excluded() {
        let a = walk("A", &noise(1, 60));
        let b = walk("B", &noise(2, 60));
        let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..40)
            .map(|i| Bar::new(base + Duration::days(i), 10.0, 11.0, 9.0, 10.0 + i as f64, 1.0))
            .collect();
        let c = PriceSeries::new("C", Interval::Day1, bars).unwrap();

        let r = analyzer().analyze(&[a, b, c], &Deadline::unbounded()).unwrap();
        assert_eq!(r.symbols, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(r.excluded.len(), 1);
        assert_eq!(r.excluded[0].symbol, "C");
    }

    #[test]
    fn single_asset_is_insufficient() {
        let err = analyzer()
            .analyze(&[walk("A", &noise(1, 40))], &Deadline::unbounded())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn duplicate_symbol_rejected() {
        let a = walk("A", &noise(1, 40));
        let err = analyzer()
            .analyze(&[a.clone(), a], &Deadline::unbounded())
            .unwrap_err();
        assert!(err.is_terminal());
    }

    #[test]
    fn price_basis_correlates_levels() {
        let up: Vec<f64> = (0..50).map(|i| 10.0 + i as f64).collect();
        let up2: Vec<f64> = (0..50).map(|i| 20.0 + 2.0 * i as f64).collect();
        let cfg = CorrelationConfig {
            use_returns: false,
            ..CorrelationConfig::default()
        };
        let r = CorrelationAnalyzer::new(cfg)
            .unwrap()
            .analyze(
                &[PriceSeries::from_closes("A", &up), PriceSeries::from_closes("B", &up2)],
                &Deadline::unbounded(),
            )
            .unwrap();
        assert_eq!(r.basis, CorrelationBasis::Prices);
        assert!((r.get("A", "B").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn expired_deadline_times_out() {
        let series = vec![walk("A", &noise(1, 60)), walk("B", &noise(2, 60))];
        let err = analyzer()
            .analyze(&series, &Deadline::after(std::time::Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Timeout { .. }));
    }

    #[test]
    fn result_roundtrips_through_json_with_nan() {
        let series = vec![walk("A", &noise(1, 10)), walk("B", &noise(2, 10))];
        let r = analyzer().analyze(&series, &Deadline::unbounded()).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        let back: CorrelationResult = serde_json::from_str(&json).unwrap();
        assert!(back.matrix[0][1].is_nan());
        assert_eq!(back.matrix[0][0], 1.0);
    }
}
