//! Seasonal sinusoid model.
//!
//! Implemented as small, pure functions so that fitting, residual and plotting
//! code can share one definition of the curve.

pub mod model;

pub use model::*;
