//! Incident data sources.
//!
//! - `nypd`: one-shot download of the NYPD shooting incident CSV
//! - `sample`: deterministic synthetic incidents for offline runs and tests

pub mod nypd;
pub mod sample;

pub use nypd::*;
pub use sample::*;
