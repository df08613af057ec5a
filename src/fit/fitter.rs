//! Levenberg–Marquardt fit of the seasonal sinusoid.
//!
//! Given observations `(m_i, y_i)` and an initial guess, we minimize
//!
//! ```text
//! SSE(a, c, d) = Σ (y_i - a·sin(2π·m_i/12 + c) - d)²
//! ```
//!
//! Each iteration solves the damped Gauss–Newton step as an augmented linear
//! least-squares problem `[J; sqrt(λ·D)] δ = [r; 0]` (Marquardt scaling,
//! `D = diag(JᵀJ)`). Accepted steps divide λ by 10, rejected steps multiply
//! it by 10. The scheme is fixed and uses no randomness, so repeated fits of
//! the same input are identical.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FitQuality, FitResult, Observation, SineParams, StopReason};
use crate::error::FitError;
use crate::fit::guess::InitialGuess;
use crate::fit::inference::infer;
use crate::math::solve_least_squares;
use crate::models::{PARAM_COUNT, canonicalize, fill_jacobian_row, predict};

/// Fewer observations than this cannot support three parameters plus a
/// residual degree of freedom.
pub const MIN_OBSERVATIONS: usize = 4;

/// SSE (relative to `1 + Σy²`) treated as an exact fit.
const ZERO_SSE_REL: f64 = 1e-20;
/// Gradient max-norm (relative to `1 + Σy²`) treated as stationary.
const ZERO_GRADIENT_REL: f64 = 1e-15;
/// Damping ceiling: beyond this no step can reduce SSE in floating point.
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-15;
/// Floor (relative to the largest entry) for the Marquardt scaling diagonal.
const DIAG_FLOOR_REL: f64 = 1e-12;

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Iteration cap; exceeding it is a `FitError::Convergence`.
    pub max_iterations: usize,
    /// Stop when an accepted step reduces SSE by less than this fraction.
    pub rel_tolerance: f64,
    /// Starting damping factor.
    pub initial_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            rel_tolerance: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

/// Fit with the data-derived initial guess.
pub fn fit_observations(
    observations: &[Observation],
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    fit_seasonal(observations, InitialGuess::from_observations(observations), opts)
}

/// Fit `a·sin(2π·m/12 + c) + d` to the observations.
///
/// Returns the canonical parameters (`a >= 0`, `c ∈ (-π, π]`) with standard
/// errors, t-statistics and two-sided normal p-values.
pub fn fit_seasonal(
    observations: &[Observation],
    guess: InitialGuess,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    validate_observations(observations)?;
    validate_options(opts)?;
    if !guess.is_finite() {
        return Err(FitError::DegenerateInput(format!(
            "initial guess is not finite: a={}, c={}, d={}",
            guess.amplitude, guess.phase, guess.midline
        )));
    }

    let months: Vec<f64> = observations.iter().map(|o| o.month as f64).collect();
    let y: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let n = y.len();
    let scale = 1.0 + y.iter().map(|v| v * v).sum::<f64>();

    let mut params = guess.params();
    let mut r = residuals(&params, &months, &y);
    let mut sse = sum_sq(&r);
    if !sse.is_finite() {
        return Err(FitError::DegenerateInput(
            "objective is not finite at the initial guess".to_string(),
        ));
    }

    let mut lambda = opts.initial_lambda;
    let mut iterations = 0usize;
    let mut stop = if sse <= ZERO_SSE_REL * scale {
        Some(StopReason::ZeroResidual)
    } else {
        None
    };

    while stop.is_none() {
        if iterations >= opts.max_iterations {
            return Err(FitError::Convergence { iterations, sse });
        }
        iterations += 1;

        let j = jacobian(&params, &months);
        let rv = DVector::from_column_slice(&r);
        let gradient = j.transpose() * &rv;
        if gradient.amax() <= ZERO_GRADIENT_REL * scale {
            stop = Some(StopReason::ZeroGradient);
            break;
        }

        let diag = scaling_diagonal(&j);

        // Inner loop: raise damping until a step reduces SSE.
        loop {
            let step = damped_step(&j, &r, &diag, lambda);
            if let Some(delta) = step {
                let candidate = SineParams {
                    amplitude: params.amplitude + delta[0],
                    phase: params.phase + delta[1],
                    midline: params.midline + delta[2],
                };
                let r_new = residuals(&candidate, &months, &y);
                let sse_new = sum_sq(&r_new);

                if sse_new.is_finite() && sse_new < sse {
                    let reduction = (sse - sse_new) / sse;
                    params = candidate;
                    r = r_new;
                    sse = sse_new;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    debug!(iteration = iterations, sse, lambda, reduction, "accepted step");

                    if sse <= ZERO_SSE_REL * scale {
                        stop = Some(StopReason::ZeroResidual);
                    } else if reduction < opts.rel_tolerance {
                        stop = Some(StopReason::RelativeReduction);
                    }
                    break;
                }
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                stop = Some(StopReason::Stationary);
                break;
            }
        }
    }

    let stop = stop.unwrap_or(StopReason::Stationary);
    debug!(iterations, sse, stop = ?stop, "seasonal fit converged");

    let params = canonicalize(params);
    let sse = sum_sq(&residuals(&params, &months, &y));
    let inference = infer(&params, &months, sse);
    let [amplitude, phase, midline] = inference.estimates;

    Ok(FitResult {
        params,
        amplitude,
        phase,
        midline,
        converged: true,
        quality: FitQuality {
            sse,
            rmse: (sse / n as f64).sqrt(),
            residual_std_error: inference.residual_std_error,
            df: inference.df,
            n,
            iterations,
            stop,
        },
    })
}

fn validate_observations(observations: &[Observation]) -> Result<(), FitError> {
    if observations.len() < MIN_OBSERVATIONS {
        return Err(FitError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            got: observations.len(),
        });
    }

    let mut seen = HashSet::new();
    for o in observations {
        if !(1..=12).contains(&o.month) {
            return Err(FitError::InvalidObservation(format!(
                "month {} is outside 1..=12",
                o.month
            )));
        }
        if !seen.insert(o.month) {
            return Err(FitError::InvalidObservation(format!(
                "month {} appears more than once",
                o.month
            )));
        }
        if !o.value.is_finite() {
            return Err(FitError::DegenerateInput(format!(
                "value for month {} is not finite ({})",
                o.month, o.value
            )));
        }
    }
    Ok(())
}

fn validate_options(opts: &FitOptions) -> Result<(), FitError> {
    if opts.max_iterations == 0 {
        return Err(FitError::DegenerateInput(
            "max_iterations must be >= 1".to_string(),
        ));
    }
    if !(opts.rel_tolerance.is_finite() && opts.rel_tolerance > 0.0) {
        return Err(FitError::DegenerateInput(format!(
            "rel_tolerance must be finite and > 0 (got {})",
            opts.rel_tolerance
        )));
    }
    if !(opts.initial_lambda.is_finite() && opts.initial_lambda > 0.0) {
        return Err(FitError::DegenerateInput(format!(
            "initial_lambda must be finite and > 0 (got {})",
            opts.initial_lambda
        )));
    }
    Ok(())
}

fn residuals(params: &SineParams, months: &[f64], y: &[f64]) -> Vec<f64> {
    months
        .iter()
        .zip(y.iter())
        .map(|(&m, &yi)| yi - predict(params, m))
        .collect()
}

fn sum_sq(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn jacobian(params: &SineParams, months: &[f64]) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(months.len(), PARAM_COUNT);
    let mut row = [0.0; PARAM_COUNT];
    for (i, &m) in months.iter().enumerate() {
        fill_jacobian_row(params, m, &mut row);
        for k in 0..PARAM_COUNT {
            j[(i, k)] = row[k];
        }
    }
    j
}

/// `diag(JᵀJ)`, floored so a vanishing column still gets damped.
fn scaling_diagonal(j: &DMatrix<f64>) -> [f64; PARAM_COUNT] {
    let mut diag = [0.0; PARAM_COUNT];
    for k in 0..PARAM_COUNT {
        diag[k] = j.column(k).norm_squared();
    }
    let max = diag.iter().copied().fold(0.0_f64, f64::max);
    let floor = (DIAG_FLOOR_REL * max).max(f64::MIN_POSITIVE);
    diag.map(|d| d.max(floor))
}

fn damped_step(
    j: &DMatrix<f64>,
    r: &[f64],
    diag: &[f64; PARAM_COUNT],
    lambda: f64,
) -> Option<DVector<f64>> {
    let n = j.nrows();
    let mut a = DMatrix::<f64>::zeros(n + PARAM_COUNT, PARAM_COUNT);
    let mut b = DVector::<f64>::zeros(n + PARAM_COUNT);

    for i in 0..n {
        for k in 0..PARAM_COUNT {
            a[(i, k)] = j[(i, k)];
        }
        b[i] = r[i];
    }
    for k in 0..PARAM_COUNT {
        a[(n + k, k)] = (lambda * diag[k]).sqrt();
    }

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn sinusoid(a: f64, c: f64, d: f64) -> Vec<Observation> {
        (1..=12)
            .map(|m| Observation {
                month: m,
                value: a * (TAU * m as f64 / 12.0 + c).sin() + d,
            })
            .collect()
    }

    #[test]
    fn recovers_noise_free_sinusoid() {
        let obs = sinusoid(5.0, 0.3, 50.0);
        let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
        assert!(fit.converged);
        assert!((fit.params.amplitude - 5.0).abs() < 1e-6);
        assert!((fit.params.phase - 0.3).abs() < 1e-6);
        assert!((fit.params.midline - 50.0).abs() < 1e-6);
        assert!(fit.quality.sse < 1e-10);
    }

    #[test]
    fn constant_input_converges_with_zero_amplitude() {
        let obs: Vec<Observation> = (1..=12).map(|m| Observation { month: m, value: 7.5 }).collect();
        let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
        assert!(fit.params.amplitude.abs() < 1e-9);
        assert!((fit.params.midline - 7.5).abs() < 1e-9);
        assert_eq!(fit.quality.stop, StopReason::ZeroResidual);
        assert!(fit.phase.std_error.is_none());
    }

    #[test]
    fn fewer_than_four_points_is_insufficient() {
        let obs = &sinusoid(1.0, 0.0, 0.0)[..3];
        let err = fit_observations(obs, &FitOptions::default()).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { needed: 4, got: 3 });
    }

    #[test]
    fn non_finite_value_is_degenerate() {
        let mut obs = sinusoid(1.0, 0.0, 3.0);
        obs[0].value = f64::NEG_INFINITY;
        let err = fit_observations(&obs, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::DegenerateInput(_)));
    }

    #[test]
    fn duplicate_and_out_of_range_months_are_rejected() {
        let mut obs = sinusoid(1.0, 0.0, 3.0);
        obs[1].month = 1;
        assert!(matches!(
            fit_observations(&obs, &FitOptions::default()),
            Err(FitError::InvalidObservation(_))
        ));

        let mut obs = sinusoid(1.0, 0.0, 3.0);
        obs[11].month = 13;
        assert!(matches!(
            fit_observations(&obs, &FitOptions::default()),
            Err(FitError::InvalidObservation(_))
        ));
    }

    #[test]
    fn iteration_cap_reports_convergence_error() {
        let obs = sinusoid(5.0, 0.3, 50.0);
        let guess = InitialGuess {
            amplitude: 1.0,
            phase: 2.0,
            midline: 0.0,
        };
        let opts = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let err = fit_seasonal(&obs, guess, &opts).unwrap_err();
        assert!(matches!(err, FitError::Convergence { iterations: 1, .. }));
    }

    #[test]
    fn negative_amplitude_solution_is_canonicalized() {
        // Start near the mirrored solution (a < 0, c shifted by π).
        let obs = sinusoid(4.0, 1.0, 20.0);
        let guess = InitialGuess {
            amplitude: -3.5,
            phase: 1.0 + std::f64::consts::PI - 0.1,
            midline: 20.0,
        };
        let fit = fit_seasonal(&obs, guess, &FitOptions::default()).unwrap();
        assert!(fit.params.amplitude > 0.0);
        assert!((fit.params.amplitude - 4.0).abs() < 1e-6);
        assert!((fit.params.phase - 1.0).abs() < 1e-6);
    }

    #[test]
    fn works_on_partial_year() {
        let obs: Vec<Observation> = sinusoid(2.0, -0.5, 10.0).into_iter().take(6).collect();
        let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
        assert_eq!(fit.quality.n, 6);
        assert_eq!(fit.quality.df, 3);
        assert!(fit.quality.sse < 1e-10);
    }
}
