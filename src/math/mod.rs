//! Mathematical utilities: least squares, normal-distribution helpers, moments.

pub mod moments;
pub mod normal;
pub mod ols;

pub use moments::*;
pub use normal::*;
pub use ols::*;
