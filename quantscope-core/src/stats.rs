//! Statistical primitives, implemented from first principles.
//!
//! - Descriptive statistics (mean, sample/population deviation, covariance,
//!   quantiles) that skip nothing: callers filter NaN first.
//! - Pearson correlation and its two-sided significance test
//!   (Student's t with n-2 degrees of freedom).
//! - Normal distribution pdf/cdf/ppf for parametric VaR.
//! - Lanczos ln(Gamma) and the regularized incomplete beta function, which
//!   back the Student's t CDF.

use std::f64::consts::PI;

/// Variances below this are treated as zero.
pub const VARIANCE_EPSILON: f64 = 1e-24;

// ─── Descriptive statistics ──────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). 0.0 for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Population variance (n denominator). 0.0 for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Sample covariance of two equal-length slices. 0.0 if shorter than two.
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    x[..n]
        .iter()
        .zip(&y[..n])
        .map(|(a, b)| (a - mx) * (b - my))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Linear-interpolated quantile of an ascending-sorted slice, `p` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Quantile of an unsorted slice (NaN values are dropped).
pub fn quantile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p)
}

/// Rolling z-score of each point against the preceding `window` points.
///
/// NaN until `window` prior points exist. A zero-deviation window yields 0.0
/// rather than a division by zero.
pub fn rolling_zscore(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window < 2 {
        return out;
    }
    for i in window..n {
        let hist = &values[i - window..i];
        if values[i].is_nan() || hist.iter().any(|v| v.is_nan()) {
            continue;
        }
        let m = mean(hist);
        let sd = sample_std(hist);
        out[i] = if sd * sd < VARIANCE_EPSILON {
            0.0
        } else {
            (values[i] - m) / sd
        };
    }
    out
}

// ─── Correlation ─────────────────────────────────────────────────────

/// Pearson correlation of two equal-length slices.
///
/// `None` if fewer than two points or either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx < VARIANCE_EPSILON || syy < VARIANCE_EPSILON {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Two-sided p-value for H0: rho = 0 given sample correlation `r` over `n` points.
///
/// t = r * sqrt((n - 2) / (1 - r^2)), df = n - 2.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 || r.is_nan() {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return 0.0;
    }
    let t = r * (df / denom).sqrt();
    (2.0 * (1.0 - t_cdf(t.abs(), df))).clamp(0.0, 1.0)
}

// ─── Normal distribution ─────────────────────────────────────────────

pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Inverse standard normal CDF (Acklam's rational approximation).
///
/// Relative error below 1.2e-9 over (0, 1). Returns ±inf at the endpoints.
pub fn normal_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

// ─── Student's t ─────────────────────────────────────────────────────

/// ln(Gamma(x)) by the Lanczos approximation (g = 7, nine terms).
fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const LANCZOS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection: Gamma(x) Gamma(1 - x) = pi / sin(pi x)
        let s = (PI * x).sin().abs();
        if s < 1e-300 {
            return f64::INFINITY;
        }
        return PI.ln() - s.ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let series = LANCZOS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS[0], |acc, (i, &c)| acc + c / (x + i as f64));
    let t = x + 7.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Regularized incomplete beta I_x(a, b), continued fraction (modified Lentz).
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 || x == 1.0 {
        return x;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - incomplete_beta(b, a, 1.0 - x);
    }

    const TINY: f64 = 1e-30;
    const EPS: f64 = 1e-14;
    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let front =
        (a * x.ln() + b * (1.0 - x).ln() - ln_gamma(a) - ln_gamma(b) + ln_gamma(a + b)).exp() / a;

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut f = d;

    for m in 1..=200 {
        let m = m as f64;
        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        f *= c * d;

        let odd = -(a + m) * (a + b + m) * x / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    front * f
}

/// Student's t CDF: P(T <= t) with `df` degrees of freedom.
pub fn t_cdf(t: f64, df: f64) -> f64 {
    if df <= 0.0 || t.is_nan() {
        return f64::NAN;
    }
    if t == 0.0 {
        return 0.5;
    }
    let tail = 0.5 * incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() < eps, "{a} vs {b}");
    }

    #[test]
    fn descriptive_basics() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        approx(mean(&v), 5.0, 1e-12);
        approx(population_std(&v), 2.0, 1e-12);
        approx(sample_variance(&v), 32.0 / 7.0, 1e-12);
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn covariance_matches_variance_on_self() {
        let v = [1.0, 3.0, 2.0, 5.0];
        approx(covariance(&v, &v), sample_variance(&v), 1e-12);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        approx(quantile_sorted(&sorted, 0.0), 1.0, 1e-12);
        approx(quantile_sorted(&sorted, 0.5), 3.0, 1e-12);
        approx(quantile_sorted(&sorted, 0.625), 3.5, 1e-12);
        approx(quantile(&[5.0, f64::NAN, 1.0, 3.0], 0.5), 3.0, 1e-12);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn rolling_zscore_constant_is_zero() {
        let z = rolling_zscore(&[1.0; 10], 5);
        assert!(z[..5].iter().all(|v| v.is_nan()));
        assert!(z[5..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let z = [4.0, 3.0, 2.0, 1.0];
        approx(pearson(&x, &y).unwrap(), 1.0, 1e-12);
        approx(pearson(&x, &z).unwrap(), -1.0, 1e-12);
        assert!(pearson(&x, &[1.0; 4]).is_none());
    }

    #[test]
    fn correlation_p_value_behaviour() {
        assert!(correlation_p_value(0.0, 50) > 0.99);
        assert!(correlation_p_value(0.9, 50) < 1e-6);
        assert_eq!(correlation_p_value(1.0, 50), 0.0);
        assert_eq!(correlation_p_value(0.5, 2), 1.0);
        // r = 0.3, n = 30 → t ≈ 1.665, two-sided p ≈ 0.107
        approx(correlation_p_value(0.3, 30), 0.107, 0.005);
    }

    #[test]
    fn normal_cdf_known_values() {
        approx(normal_cdf(0.0), 0.5, 1e-7);
        approx(normal_cdf(1.96), 0.975, 1e-4);
        approx(normal_cdf(-1.6448536), 0.05, 1e-6);
    }

    #[test]
    fn normal_ppf_known_values() {
        approx(normal_ppf(0.5), 0.0, 1e-9);
        approx(normal_ppf(0.95), 1.6448536269514722, 1e-8);
        approx(normal_ppf(0.99), 2.3263478740408408, 1e-8);
        approx(normal_ppf(0.01), -2.3263478740408408, 1e-8);
        assert!(normal_ppf(1.5).is_nan());
    }

    #[test]
    fn ppf_inverts_cdf() {
        for &p in &[0.01, 0.1, 0.3, 0.5, 0.7, 0.9, 0.99] {
            approx(normal_cdf(normal_ppf(p)), p, 1e-6);
        }
    }

    #[test]
    fn t_cdf_symmetry_and_limits() {
        approx(t_cdf(0.0, 10.0), 0.5, 1e-12);
        approx(t_cdf(1.5, 10.0) + t_cdf(-1.5, 10.0), 1.0, 1e-10);
        // t(df=10) 97.5% quantile ≈ 2.228
        approx(t_cdf(2.228, 10.0), 0.975, 1e-3);
        // large df approaches normal
        approx(t_cdf(1.96, 10_000.0), normal_cdf(1.96), 1e-3);
    }
}
