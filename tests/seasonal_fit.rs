//! Fitter behavior through the public library API.

use approx::assert_relative_eq;
use proptest::prelude::*;

use seasonal_curves::domain::{Observation, SineParams};
use seasonal_curves::error::FitError;
use seasonal_curves::fit::{FitOptions, InitialGuess, fit_observations, fit_seasonal};
use seasonal_curves::models::{month_angle, predict};
use seasonal_curves::report::compute_residuals;

fn sinusoid(a: f64, c: f64, d: f64) -> Vec<Observation> {
    (1..=12)
        .map(|m| Observation {
            month: m,
            value: a * (month_angle(m as f64) + c).sin() + d,
        })
        .collect()
}

#[test]
fn recovers_noise_free_sinusoid() {
    let obs = sinusoid(5.0, 0.3, 50.0);
    let fit = fit_observations(&obs, &FitOptions::default()).unwrap();

    assert_relative_eq!(fit.params.amplitude, 5.0, epsilon = 1e-6);
    assert_relative_eq!(fit.params.phase, 0.3, epsilon = 1e-6);
    assert_relative_eq!(fit.params.midline, 50.0, epsilon = 1e-6);
    assert!(fit.converged);

    for r in compute_residuals(&obs, &fit).unwrap() {
        assert!(r.residual.abs() < 1e-6, "month {} residual {}", r.month, r.residual);
    }
}

#[test]
fn constant_series_has_zero_amplitude() {
    let obs: Vec<Observation> = (1..=12).map(|m| Observation { month: m, value: 7.5 }).collect();
    let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
    assert!(fit.params.amplitude.abs() < 1e-9);
    assert_relative_eq!(fit.params.midline, 7.5, epsilon = 1e-9);
    assert!(fit.phase.std_error.is_none());
}

#[test]
fn three_points_is_insufficient() {
    let obs = &sinusoid(1.0, 0.0, 0.0)[..3];
    let err = fit_observations(obs, &FitOptions::default()).unwrap_err();
    assert_eq!(err, FitError::InsufficientData { needed: 4, got: 3 });
}

#[test]
fn refit_from_solution_is_idempotent() {
    let mut obs = sinusoid(3.0, -1.2, 20.0);
    obs[4].value += 0.4;
    obs[9].value -= 0.3;
    let opts = FitOptions::default();

    let first = fit_observations(&obs, &opts).unwrap();
    let again = fit_observations(&obs, &opts).unwrap();
    assert_eq!(first, again);

    let from_solution = InitialGuess {
        amplitude: first.params.amplitude,
        phase: first.params.phase,
        midline: first.params.midline,
    };
    let refit = fit_seasonal(&obs, from_solution, &opts).unwrap();
    assert_relative_eq!(refit.params.amplitude, first.params.amplitude, epsilon = 1e-6);
    assert_relative_eq!(refit.params.phase, first.params.phase, epsilon = 1e-6);
    assert_relative_eq!(refit.params.midline, first.params.midline, epsilon = 1e-6);
    assert!(refit.quality.sse <= first.quality.sse * (1.0 + 1e-9) + 1e-12);
}

#[test]
fn strong_seasonality_is_significant() {
    let mut obs = sinusoid(5.0, 0.3, 50.0);
    for (i, o) in obs.iter_mut().enumerate() {
        o.value += if i % 2 == 0 { 0.1 } else { -0.1 };
    }
    let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
    let p = fit.amplitude.p_value.unwrap();
    assert!(p < 1e-10, "p = {p}");
}

#[test]
fn alternating_noise_is_not_seasonal() {
    // (-1)^m is orthogonal to every period-12 sinusoid.
    let obs: Vec<Observation> = (1..=12)
        .map(|m| Observation {
            month: m,
            value: 50.0 + if m % 2 == 0 { 1.0 } else { -1.0 },
        })
        .collect();
    let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
    assert!(fit.params.amplitude < 1e-3);
    if let Some(p) = fit.amplitude.p_value {
        assert!(p > 0.99, "p = {p}");
    }
    assert_relative_eq!(fit.params.midline, 50.0, epsilon = 1e-6);
}

#[test]
fn bad_inputs_are_typed_errors() {
    let mut obs = sinusoid(1.0, 0.0, 5.0);
    obs[2].value = f64::NAN;
    assert!(matches!(
        fit_observations(&obs, &FitOptions::default()),
        Err(FitError::DegenerateInput(_))
    ));

    let mut obs = sinusoid(1.0, 0.0, 5.0);
    obs[3].month = 13;
    assert!(matches!(
        fit_observations(&obs, &FitOptions::default()),
        Err(FitError::InvalidObservation(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn recovers_any_noise_free_curve(
        a in 0.5f64..20.0,
        c in -3.0f64..3.0,
        d in -50.0f64..100.0,
    ) {
        let obs = sinusoid(a, c, d);
        let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
        let truth = SineParams { amplitude: a, phase: c, midline: d };
        prop_assert!(fit.params.amplitude >= 0.0);
        prop_assert!(fit.params.phase > -std::f64::consts::PI - 1e-12);
        prop_assert!(fit.params.phase <= std::f64::consts::PI + 1e-12);
        prop_assert!((fit.params.amplitude - a).abs() < 1e-5 * (1.0 + a));
        for m in 1..=12 {
            let m = m as f64;
            prop_assert!((predict(&fit.params, m) - predict(&truth, m)).abs() < 1e-5 * (1.0 + a + d.abs()));
        }
    }

    #[test]
    fn residuals_reconstruct_observations(values in prop::collection::vec(0.0f64..100.0, 12)) {
        let obs: Vec<Observation> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation { month: i as u32 + 1, value: v })
            .collect();
        let opts = FitOptions::default();
        match fit_observations(&obs, &opts) {
            Ok(fit) => {
                let again = fit_observations(&obs, &opts).unwrap();
                prop_assert_eq!(&fit, &again);
                for (r, o) in compute_residuals(&obs, &fit).unwrap().iter().zip(&obs) {
                    prop_assert_eq!(r.observed, o.value);
                    prop_assert_eq!(r.predicted, predict(&fit.params, o.month as f64));
                    prop_assert_eq!(r.residual, r.observed - r.predicted);
                }
            }
            Err(err) => prop_assert!(matches!(err, FitError::Convergence { .. }), "{err}"),
        }
    }
}
