//! Standard normal helpers for large-sample inference and QQ plots.

use statrs::distribution::{ContinuousCDF, Normal};

fn standard_normal() -> Normal {
    // Parameters are constant and valid; `new` only rejects non-finite or
    // non-positive scale.
    match Normal::new(0.0, 1.0) {
        Ok(n) => n,
        Err(_) => unreachable!("standard normal parameters are valid"),
    }
}

/// Two-sided p-value `2·(1 − Φ(|t|))`.
///
/// Infinite `|t|` gives 0; NaN gives NaN.
pub fn two_sided_p_value(t: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    // `sf` keeps precision in the upper tail where `1 - cdf` underflows to 0.
    let p = 2.0 * standard_normal().sf(t.abs());
    p.clamp(0.0, 1.0)
}

/// Standard normal quantile `Φ⁻¹(p)` for `p ∈ (0, 1)`.
pub fn normal_quantile(p: f64) -> f64 {
    standard_normal().inverse_cdf(p)
}

/// Plotting positions for normal QQ plots (`ppoints` convention).
///
/// `(i - a) / (n + 1 - 2a)` for `i = 1..=n` with `a = 3/8` when `n <= 10`,
/// else `a = 1/2`.
pub fn ppoints(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let a = if n <= 10 { 3.0 / 8.0 } else { 0.5 };
    let nf = n as f64;
    (1..=n)
        .map(|i| (i as f64 - a) / (nf + 1.0 - 2.0 * a))
        .collect()
}
