//! Sector-level correlation summary.
//!
//! The sector map comes from the caller. Symbols missing from it are grouped
//! under `unassigned`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CorrelationResult;
use crate::stats::mean;

/// symbol → sector name.
pub type SectorMap = BTreeMap<String, String>;

pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorSummary {
    /// Mean pairwise correlation within each sector (sectors with at least
    /// one defined pair).
    pub intra_sector: BTreeMap<String, f64>,
    /// Mean correlation between members of two sectors, keyed `"A|B"` with
    /// `A < B`.
    pub inter_sector: BTreeMap<String, f64>,
    pub average_intra: Option<f64>,
    pub average_inter: Option<f64>,
}

pub(crate) fn summarize(result: &CorrelationResult, sectors: &SectorMap) -> SectorSummary {
    let sector_of = |s: &str| -> String {
        sectors
            .get(s)
            .cloned()
            .unwrap_or_else(|| UNASSIGNED.to_string())
    };

    let mut intra: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut inter: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut all_intra = Vec::new();
    let mut all_inter = Vec::new();

    for pair in &result.pairs {
        if pair.correlation.is_nan() {
            continue;
        }
        let (sa, sb) = (sector_of(&pair.a), sector_of(&pair.b));
        if sa == sb {
            intra.entry(sa).or_default().push(pair.correlation);
            all_intra.push(pair.correlation);
        } else {
            let key = if sa < sb {
                format!("{sa}|{sb}")
            } else {
                format!("{sb}|{sa}")
            };
            inter.entry(key).or_default().push(pair.correlation);
            all_inter.push(pair.correlation);
        }
    }

    SectorSummary {
        intra_sector: intra.into_iter().map(|(k, v)| (k, mean(&v))).collect(),
        inter_sector: inter.into_iter().map(|(k, v)| (k, mean(&v))).collect(),
        average_intra: (!all_intra.is_empty()).then(|| mean(&all_intra)),
        average_inter: (!all_inter.is_empty()).then(|| mean(&all_inter)),
    }
}
