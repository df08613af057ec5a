//! Model evaluation for `value(month) = a·sin(2π·month/12 + c) + d`.
//!
//! The fitter relies on two primitive operations:
//! - predict the value at a (possibly fractional) month, for residuals/plots
//! - fill the Jacobian row `∂value/∂(a, c, d)` at a month, for the LM step

use std::f64::consts::{PI, TAU};

use crate::domain::SineParams;

/// Seasonal period in months.
pub const PERIOD: f64 = 12.0;

/// Number of model parameters (amplitude, phase, midline).
pub const PARAM_COUNT: usize = 3;

/// Angle `2π·month/12` before the phase shift.
pub fn month_angle(month: f64) -> f64 {
    TAU * month / PERIOD
}

/// Predict the value at `month` (fractional months allowed for dense curves).
pub fn predict(params: &SineParams, month: f64) -> f64 {
    params.amplitude * (month_angle(month) + params.phase).sin() + params.midline
}

/// Fill the Jacobian row for `month`.
///
/// Column order matches `SineParams`: amplitude, phase, midline.
pub fn fill_jacobian_row(params: &SineParams, month: f64, out: &mut [f64; PARAM_COUNT]) {
    let theta = month_angle(month) + params.phase;
    out[0] = theta.sin();
    out[1] = params.amplitude * theta.cos();
    out[2] = 1.0;
}

/// Fold a negative amplitude into the phase and wrap the phase into `(-π, π]`.
///
/// `predict` is unchanged up to floating-point rounding.
pub fn canonicalize(params: SineParams) -> SineParams {
    let (amplitude, phase) = if params.amplitude < 0.0 {
        (-params.amplitude, params.phase + PI)
    } else {
        (params.amplitude, params.phase)
    };
    SineParams {
        amplitude,
        phase: wrap_phase(phase),
        midline: params.midline,
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return phase;
    }
    let mut p = phase.rem_euclid(TAU);
    if p > PI {
        p -= TAU;
    }
    p
}

/// Month (within `[1, 13)`) at which the fitted curve peaks.
///
/// `None` when the amplitude is zero (flat curve).
pub fn peak_month(params: &SineParams) -> Option<f64> {
    if params.amplitude == 0.0 || !params.amplitude.is_finite() {
        return None;
    }
    let p = canonicalize(*params);
    // sin peaks where 2π·m/12 + c = π/2 (mod 2π).
    let m = (PI / 2.0 - p.phase) * PERIOD / TAU;
    Some((m - 1.0).rem_euclid(PERIOD) + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_closed_form() {
        let params = SineParams {
            amplitude: 5.0,
            phase: 0.3,
            midline: 50.0,
        };
        let y = predict(&params, 3.0);
        let expected = 5.0 * (TAU * 3.0 / 12.0 + 0.3).sin() + 50.0;
        assert_eq!(y, expected);
    }

    #[test]
    fn canonicalize_preserves_curve() {
        let raw = SineParams {
            amplitude: -2.0,
            phase: 7.0,
            midline: 1.0,
        };
        let c = canonicalize(raw);
        assert!(c.amplitude > 0.0);
        assert!(c.phase > -PI && c.phase <= PI);
        for m in 1..=12 {
            let m = m as f64;
            assert!((predict(&raw, m) - predict(&c, m)).abs() < 1e-12);
        }
    }

    #[test]
    fn wrap_phase_range() {
        assert!((wrap_phase(0.3 + TAU) - 0.3).abs() < 1e-12);
        assert!((wrap_phase(-PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn peak_month_for_zero_phase_is_march() {
        // sin(2π·m/12) peaks at m = 3.
        let params = SineParams {
            amplitude: 1.0,
            phase: 0.0,
            midline: 0.0,
        };
        let m = peak_month(&params).unwrap();
        assert!((m - 3.0).abs() < 1e-12);
    }

    #[test]
    fn jacobian_row_matches_finite_difference() {
        let params = SineParams {
            amplitude: 3.0,
            phase: 0.7,
            midline: 10.0,
        };
        let mut row = [0.0; PARAM_COUNT];
        fill_jacobian_row(&params, 5.0, &mut row);

        let h = 1e-6;
        let base = predict(&params, 5.0);
        let da = (predict(&SineParams { amplitude: 3.0 + h, ..params }, 5.0) - base) / h;
        let dc = (predict(&SineParams { phase: 0.7 + h, ..params }, 5.0) - base) / h;
        assert!((row[0] - da).abs() < 1e-5);
        assert!((row[1] - dc).abs() < 1e-5);
        assert_eq!(row[2], 1.0);
    }
}
