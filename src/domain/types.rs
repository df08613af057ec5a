//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Where incident records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Download the NYPD shooting incident CSV (NYC Open Data).
    Nypd,
    /// Read an incident CSV from disk (same schema as the NYPD export).
    Csv,
    /// Generate seasonal incidents locally (deterministic per seed).
    Synthetic,
}

/// Per-year monthly value that is averaged across years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Statistic {
    /// Raw incident count for the year-month.
    Count,
    /// Natural log of the year-month count.
    LogCount,
}

impl Statistic {
    pub fn display_name(self) -> &'static str {
        match self {
            Statistic::Count => "mean count",
            Statistic::LogCount => "mean ln(count)",
        }
    }

    /// Apply the statistic to a raw year-month count.
    ///
    /// `LogCount` of zero is `-inf`; the fitter rejects it as degenerate input.
    pub fn apply(self, count: u64) -> f64 {
        match self {
            Statistic::Count => count as f64,
            Statistic::LogCount => (count as f64).ln(),
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Statistic::Count => Statistic::LogCount,
            Statistic::LogCount => Statistic::Count,
        }
    }
}

/// What one unit of the monthly count is.
///
/// The NYPD export has one row per victim; several rows can share an
/// `INCIDENT_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CountUnit {
    /// Count distinct incident keys (rows without a key count individually).
    Incident,
    /// Count rows.
    Victim,
}

impl CountUnit {
    pub fn toggle(self) -> Self {
        match self {
            CountUnit::Incident => CountUnit::Victim,
            CountUnit::Victim => CountUnit::Incident,
        }
    }
}

/// One parsed incident row.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentRecord {
    pub key: Option<String>,
    pub occurred: NaiveDateTime,
}

/// Statistics of one calendar month across years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStat {
    /// Calendar month, 1..=12.
    pub month: u32,
    /// Number of years contributing a value.
    pub n_years: usize,
    pub mean: f64,
    /// Sample variance (`n-1`); `None` with fewer than two years.
    pub variance: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Aggregated 12-row table consumed by the fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTable {
    pub statistic: Statistic,
    pub unit: CountUnit,
    pub rows: Vec<MonthlyStat>,
    pub first_year: i32,
    pub last_year: i32,
    /// Total units counted over the whole span.
    pub total_count: u64,
}

impl MonthlyTable {
    /// Fitter input: one observation per calendar month, in month order.
    pub fn observations(&self) -> Vec<Observation> {
        self.rows
            .iter()
            .map(|r| Observation {
                month: r.month,
                value: r.mean,
            })
            .collect()
    }

    pub fn row(&self, month: u32) -> Option<&MonthlyStat> {
        self.rows.iter().find(|r| r.month == month)
    }
}

/// A single (month, statistic) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar month, 1..=12.
    pub month: u32,
    pub value: f64,
}

/// Parameters of `a·sin(2π·month/12 + c) + d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SineParams {
    pub amplitude: f64,
    /// Radians.
    pub phase: f64,
    pub midline: f64,
}

/// Estimate and large-sample inference for one parameter.
///
/// `std_error`, `t_value` and `p_value` are `None` when the parameter is not
/// identified at the solution (phase of a zero-amplitude fit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub t_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Relative SSE reduction of an accepted step fell below tolerance.
    RelativeReduction,
    /// SSE is numerically zero.
    ZeroResidual,
    /// Gradient of the objective vanished.
    ZeroGradient,
    /// No damped step reduces SSE any further.
    Stationary,
}

impl StopReason {
    pub fn display_name(self) -> &'static str {
        match self {
            StopReason::RelativeReduction => "relative SSE reduction below tolerance",
            StopReason::ZeroResidual => "zero residual",
            StopReason::ZeroGradient => "zero gradient",
            StopReason::Stationary => "no further descent",
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    /// `sqrt(sse / df)`.
    pub residual_std_error: f64,
    /// Residual degrees of freedom (`n - 3`).
    pub df: usize,
    pub n: usize,
    pub iterations: usize,
    pub stop: StopReason,
}

/// Fit output: canonical parameters (`amplitude >= 0`, `phase ∈ (-π, π]`)
/// plus inference per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: SineParams,
    pub amplitude: ParamEstimate,
    pub phase: ParamEstimate,
    pub midline: ParamEstimate,
    pub converged: bool,
    pub quality: FitQuality,
}

impl FitResult {
    /// Named estimates in parameter order.
    pub fn estimates(&self) -> [(&'static str, &ParamEstimate); 3] {
        [
            ("amplitude", &self.amplitude),
            ("phase", &self.phase),
            ("midline", &self.midline),
        ]
    }
}

/// Observed vs. predicted for one month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    pub month: u32,
    pub observed: f64,
    pub predicted: f64,
    /// `observed - predicted`.
    pub residual: f64,
}

/// Synthetic incident generator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start_year: i32,
    pub years: u32,
    /// Mean incidents per month.
    pub base: f64,
    /// Relative seasonal swing (0.3 = ±30% around `base`).
    pub amplitude: f64,
    /// Radians.
    pub phase: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceKind,
    pub csv_path: Option<PathBuf>,
    pub data_url: Option<String>,

    pub statistic: Statistic,
    pub unit: CountUnit,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,

    pub max_iterations: usize,
    pub tolerance: f64,
    pub amplitude0: Option<f64>,
    pub phase0: Option<f64>,
    pub midline0: Option<f64>,

    pub synthetic: SyntheticConfig,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub statistic: Statistic,
    pub unit: CountUnit,
    pub first_year: i32,
    pub last_year: i32,
    pub observations: Vec<Observation>,
    pub fit: FitResult,
    pub grid: FitGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitGrid {
    pub month: Vec<f64>,
    pub value: Vec<f64>,
}

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Three-letter month label; `"?"` outside 1..=12.
pub fn month_abbrev(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_ABBREV[(month - 1) as usize],
        _ => "?",
    }
}
