//! `seasonal-curves` library crate.
//!
//! The binary (`seas`) is a thin wrapper around this library so that:
//!
//! - the fitter and diagnostics are testable without spawning processes
//! - ingest/aggregation can be reused against other incident datasets
//! - presentation (report, ASCII plot, TUI) stays out of the math code

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
