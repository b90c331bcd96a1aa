//! Property tests for analytics invariants.
//!
//! Uses proptest to verify:
//! 1. RSI stays within [0, 100]
//! 2. MACD histogram is exactly MACD minus signal
//! 3. Bollinger bands are symmetric around the middle band
//! 4. Correlation matrices are symmetric with a unit diagonal
//! 5. VaR/CVaR ordering across confidence levels
//! 6. Drawdown of a non-decreasing path is zero
//! 7. Rolling self-correlation is one for any window
//! 8. All-zero volume never produces a volume anomaly

use proptest::prelude::*;

use quantscope_core::anomaly::rules::volume_anomalies;
use quantscope_core::config::CorrelationConfig;
use quantscope_core::correlation::rolling::rolling_values;
use quantscope_core::correlation::CorrelationAnalyzer;
use quantscope_core::indicators::{Bollinger, Indicator, Macd, Rsi};
use quantscope_core::risk::{historical_var, max_drawdown, parametric_var};
use quantscope_core::{Bar, Deadline, Interval, PriceSeries};

// ── Strategies (proptest) ────────────────────────────────────────────

/// A positive random-walk close path.
fn arb_closes(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, min_len..max_len).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|r| {
                price *= 1.0 + r;
                price
            })
            .collect()
    })
}

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.1..0.1_f64, 40..200)
}

// ── 1. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(closes in arb_closes(15, 120)) {
        let series = PriceSeries::from_closes("P", &closes);
        let rsi = Rsi::new(14).unwrap().compute(&series);
        prop_assert_eq!(rsi.len(), closes.len());
        for v in rsi.values.iter().filter(|v| v.is_finite()) {
            prop_assert!((0.0..=100.0).contains(v), "RSI out of range: {}", v);
        }
    }
}

// ── 2. MACD histogram ────────────────────────────────────────────────

proptest! {
    #[test]
    fn macd_histogram_is_line_minus_signal(closes in arb_closes(40, 150)) {
        let series = PriceSeries::from_closes("P", &closes);
        let macd = Macd::new(12, 26, 9).unwrap().compute(&series);
        let signal = &macd.series["signal"];
        let histogram = &macd.series["histogram"];
        for i in 0..macd.len() {
            let expected = macd.values[i] - signal[i];
            if expected.is_nan() {
                prop_assert!(histogram[i].is_nan());
            } else {
                prop_assert_eq!(histogram[i], expected);
            }
        }
    }
}

// ── 3. Bollinger symmetry ────────────────────────────────────────────

proptest! {
    #[test]
    fn bollinger_bands_are_symmetric(closes in arb_closes(20, 120), k in 0.5..3.0_f64) {
        let series = PriceSeries::from_closes("P", &closes);
        let bb = Bollinger::new(20, k).unwrap().compute(&series);
        let upper = &bb.series["upper"];
        let lower = &bb.series["lower"];
        for i in 19..bb.len() {
            let mid = bb.values[i];
            let above = upper[i] - mid;
            let below = mid - lower[i];
            prop_assert!((above - below).abs() <= 1e-9 * mid.abs().max(1.0));
            prop_assert!(above >= 0.0);
        }
    }
}

// ── 4. Correlation matrix ────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal(
        a in arb_closes(60, 61),
        b in arb_closes(60, 61),
        c in arb_closes(60, 61),
    ) {
        let series = vec![
            PriceSeries::from_closes("A", &a),
            PriceSeries::from_closes("B", &b),
            PriceSeries::from_closes("C", &c),
        ];
        let analyzer = CorrelationAnalyzer::new(CorrelationConfig::default()).unwrap();
        let result = analyzer.analyze(&series, &Deadline::unbounded()).unwrap();
        let n = result.symbols.len();
        prop_assert_eq!(n, 3);
        for i in 0..n {
            prop_assert_eq!(result.matrix[i][i], 1.0);
            for j in 0..n {
                let (x, y) = (result.matrix[i][j], result.matrix[j][i]);
                prop_assert!(x == y || (x.is_nan() && y.is_nan()));
                if x.is_finite() {
                    prop_assert!((-1.0..=1.0).contains(&x));
                }
            }
        }
    }
}

// ── 5. VaR ordering ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn var_and_cvar_are_ordered(returns in arb_returns()) {
        for estimate in [historical_var, parametric_var] {
            let v95 = estimate(&returns, 0.95).unwrap();
            let v99 = estimate(&returns, 0.99).unwrap();
            prop_assert!(v99.var >= v95.var - 1e-12);
            prop_assert!(v95.cvar >= v95.var - 1e-12);
            prop_assert!(v99.cvar >= v99.var - 1e-12);
        }
    }
}

// ── 6. Drawdown of a monotone path ───────────────────────────────────

proptest! {
    #[test]
    fn non_decreasing_path_has_no_drawdown(
        steps in prop::collection::vec(0.0..5.0_f64, 1..200),
    ) {
        let mut price = 10.0;
        let path: Vec<f64> = steps
            .into_iter()
            .map(|s| {
                price += s;
                price
            })
            .collect();
        prop_assert_eq!(max_drawdown(&path), 0.0);
    }
}

// ── 7. Self-correlation ──────────────────────────────────────────────

proptest! {
    #[test]
    fn rolling_self_correlation_is_one(
        returns in arb_returns(),
        window in 3usize..30,
    ) {
        let values = rolling_values(&returns, &returns, window, &Deadline::unbounded()).unwrap();
        for v in values.iter().filter(|v| v.is_finite()) {
            prop_assert!((v - 1.0).abs() < 1e-9, "self-correlation {}", v);
        }
    }
}

// ── 8. Zero volume ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn zero_volume_has_no_volume_anomaly(
        closes in arb_closes(30, 100),
        window in 2usize..20,
        multiple in 1.0..5.0_f64,
    ) {
        let base = PriceSeries::from_closes("Z", &closes);
        let bars: Vec<Bar> = base
            .bars()
            .iter()
            .map(|b| Bar { volume: 0.0, ..b.clone() })
            .collect();
        let series = PriceSeries::new("Z", Interval::Day1, bars).unwrap();
        prop_assert!(volume_anomalies(&series, window, multiple).is_empty());
    }
}
