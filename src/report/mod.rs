//! Reporting utilities: residuals, diagnostics and formatted output.

pub mod diagnostics;
pub mod format;
pub mod markdown;

pub use diagnostics::*;
pub use format::*;
pub use markdown::*;

use crate::domain::{FitResult, Observation, ResidualRecord};
use crate::error::AppError;
use crate::models::predict;

/// Compute fitted values and residuals for each observation.
pub fn compute_residuals(
    observations: &[Observation],
    fit: &FitResult,
) -> Result<Vec<ResidualRecord>, AppError> {
    let mut out = Vec::with_capacity(observations.len());
    for o in observations {
        let predicted = predict(&fit.params, o.month as f64);
        if !predicted.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        out.push(ResidualRecord {
            month: o.month,
            observed: o.value,
            predicted,
            residual: o.value - predicted,
        });
    }
    Ok(out)
}
