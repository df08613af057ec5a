//! Seasonal curve fitting.
//!
//! Responsibilities:
//!
//! - derive the initial guess from the observations
//! - run Levenberg–Marquardt on `a·sin(2π·m/12 + c) + d`
//! - turn the Jacobian at the solution into standard errors and p-values

pub mod fitter;
pub mod guess;
pub mod inference;

pub use fitter::*;
pub use guess::*;
pub use inference::*;
