//! Starting point for the optimizer.
//!
//! Sinusoids are range/mean-determined to first order, so amplitude and
//! midline start from the data. Phase is the least identifiable parameter
//! and starts at 0.

use crate::domain::{Observation, SineParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    pub amplitude: f64,
    pub phase: f64,
    pub midline: f64,
}

impl InitialGuess {
    /// `a0` = half the observed range, `c0 = 0`, `d0` = observed mean.
    ///
    /// Empty input gives all zeros (the fitter rejects it anyway).
    pub fn from_observations(observations: &[Observation]) -> Self {
        if observations.is_empty() {
            return Self {
                amplitude: 0.0,
                phase: 0.0,
                midline: 0.0,
            };
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for o in observations {
            lo = lo.min(o.value);
            hi = hi.max(o.value);
            sum += o.value;
        }

        Self {
            amplitude: (hi - lo) / 2.0,
            phase: 0.0,
            midline: sum / observations.len() as f64,
        }
    }

    /// Replace individual components (e.g. from CLI flags).
    pub fn with_overrides(
        self,
        amplitude: Option<f64>,
        phase: Option<f64>,
        midline: Option<f64>,
    ) -> Self {
        Self {
            amplitude: amplitude.unwrap_or(self.amplitude),
            phase: phase.unwrap_or(self.phase),
            midline: midline.unwrap_or(self.midline),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.amplitude.is_finite() && self.phase.is_finite() && self.midline.is_finite()
    }

    pub(crate) fn params(&self) -> SineParams {
        SineParams {
            amplitude: self.amplitude,
            phase: self.phase,
            midline: self.midline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_uses_half_range_and_mean() {
        let obs = [
            Observation { month: 1, value: 2.0 },
            Observation { month: 2, value: 10.0 },
            Observation { month: 3, value: 6.0 },
        ];
        let g = InitialGuess::from_observations(&obs);
        assert_eq!(g.amplitude, 4.0);
        assert_eq!(g.phase, 0.0);
        assert_eq!(g.midline, 6.0);
    }

    #[test]
    fn overrides_replace_only_given_components() {
        let g = InitialGuess {
            amplitude: 1.0,
            phase: 0.0,
            midline: 5.0,
        }
        .with_overrides(None, Some(1.5), None);
        assert_eq!(g.amplitude, 1.0);
        assert_eq!(g.phase, 1.5);
        assert_eq!(g.midline, 5.0);
    }
}
