//! Large-sample inference at the converged solution.
//!
//! ```text
//! s²  = SSE / (n - 3)
//! Cov ≈ s² (JᵀJ)⁻¹
//! se  = sqrt(diag(Cov)),  t = estimate / se,  p = 2·(1 − Φ(|t|))
//! ```
//!
//! A parameter whose Jacobian column vanishes (phase when the amplitude is 0)
//! is not identified; it is left out of `JᵀJ` and reported without se/t/p.

use nalgebra::DMatrix;

use crate::domain::{ParamEstimate, SineParams};
use crate::math::{invert_symmetric, two_sided_p_value};
use crate::models::{PARAM_COUNT, fill_jacobian_row};

/// Column norm (relative to the largest) below which a parameter is unidentified.
const IDENTIFIABLE_REL: f64 = 1e-8;

/// Inference output for the three parameters (amplitude, phase, midline).
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub estimates: [ParamEstimate; PARAM_COUNT],
    pub residual_std_error: f64,
    pub df: usize,
}

/// Compute standard errors, t-statistics and p-values at `params`.
///
/// `months.len()` must exceed `PARAM_COUNT`; the fitter guarantees it.
pub fn infer(params: &SineParams, months: &[f64], sse: f64) -> Inference {
    let n = months.len();
    let df = n.saturating_sub(PARAM_COUNT).max(1);
    let s2 = (sse / df as f64).max(0.0);

    let mut j = DMatrix::<f64>::zeros(n, PARAM_COUNT);
    let mut row = [0.0; PARAM_COUNT];
    for (i, &m) in months.iter().enumerate() {
        fill_jacobian_row(params, m, &mut row);
        for k in 0..PARAM_COUNT {
            j[(i, k)] = row[k];
        }
    }

    let norms: Vec<f64> = (0..PARAM_COUNT).map(|k| j.column(k).norm()).collect();
    let max_norm = norms.iter().copied().fold(0.0_f64, f64::max);
    let identified: Vec<usize> = (0..PARAM_COUNT)
        .filter(|&k| max_norm > 0.0 && norms[k] > IDENTIFIABLE_REL * max_norm)
        .collect();

    let values = [params.amplitude, params.phase, params.midline];
    let mut estimates = values.map(|estimate| ParamEstimate {
        estimate,
        std_error: None,
        t_value: None,
        p_value: None,
    });

    if !identified.is_empty() {
        let jtj = j.transpose() * &j;
        let sub = DMatrix::from_fn(identified.len(), identified.len(), |a, b| {
            jtj[(identified[a], identified[b])]
        });
        if let Some(inv) = invert_symmetric(&sub) {
            for (pos, &k) in identified.iter().enumerate() {
                let var = s2 * inv[(pos, pos)];
                if !var.is_finite() {
                    continue;
                }
                let se = var.max(0.0).sqrt();
                let t = t_ratio(values[k], se);
                estimates[k].std_error = Some(se);
                estimates[k].t_value = Some(t);
                estimates[k].p_value = Some(two_sided_p_value(t));
            }
        }
    }

    Inference {
        estimates,
        residual_std_error: s2.sqrt(),
        df,
    }
}

/// `estimate / se`, with exact fits mapped to 0 (zero estimate) or ±∞.
fn t_ratio(estimate: f64, se: f64) -> f64 {
    if se > 0.0 {
        estimate / se
    } else if estimate == 0.0 {
        0.0
    } else {
        estimate.signum() * f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months() -> Vec<f64> {
        (1..=12).map(|m| m as f64).collect()
    }

    #[test]
    fn zero_amplitude_leaves_phase_unidentified() {
        let params = SineParams {
            amplitude: 0.0,
            phase: 0.0,
            midline: 10.0,
        };
        let inf = infer(&params, &months(), 0.0);
        assert!(inf.estimates[1].std_error.is_none());
        assert!(inf.estimates[1].p_value.is_none());
        // Exact fit: zero se, zero estimate -> t = 0, p = 1.
        assert_eq!(inf.estimates[0].t_value, Some(0.0));
        assert_eq!(inf.estimates[0].p_value, Some(1.0));
        assert_eq!(inf.df, 9);
    }

    #[test]
    fn standard_errors_follow_closed_form() {
        // Over a full period the columns are orthogonal:
        // Σ sin² = 6, Σ (a cos)² = 6a², Σ 1 = 12.
        let params = SineParams {
            amplitude: 2.0,
            phase: 0.0,
            midline: 5.0,
        };
        let sse = 9.0; // s² = 1
        let inf = infer(&params, &months(), sse);
        let se_a = inf.estimates[0].std_error.unwrap();
        let se_c = inf.estimates[1].std_error.unwrap();
        let se_d = inf.estimates[2].std_error.unwrap();
        assert!((se_a - (1.0_f64 / 6.0).sqrt()).abs() < 1e-9);
        assert!((se_c - (1.0_f64 / 24.0).sqrt()).abs() < 1e-9);
        assert!((se_d - (1.0_f64 / 12.0).sqrt()).abs() < 1e-9);
        assert!((inf.residual_std_error - 1.0).abs() < 1e-12);
    }

    #[test]
    fn t_ratio_handles_exact_fits() {
        assert_eq!(t_ratio(0.0, 0.0), 0.0);
        assert_eq!(t_ratio(2.0, 0.0), f64::INFINITY);
        assert_eq!(t_ratio(-2.0, 0.0), f64::NEG_INFINITY);
        assert_eq!(t_ratio(2.0, 4.0), 0.5);
    }
}
