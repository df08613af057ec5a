//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`SourceKind`, `Statistic`, `CountUnit`)
//! - incident records and the aggregated monthly table
//! - fitter inputs/outputs (`Observation`, `SineParams`, `FitResult`, `ResidualRecord`)

pub mod types;

pub use types::*;
