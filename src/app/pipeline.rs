//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! source -> ingest -> year-month counts -> monthly table -> fit -> residuals -> diagnostics
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::aggregate::{YearMonthCounts, count_by_year_month, monthly_table};
use crate::data::{IncidentClient, generate_incidents};
use crate::domain::{FitResult, MonthlyTable, Observation, ResidualRecord, RunConfig, SourceKind};
use crate::error::AppError;
use crate::fit::{FitOptions, InitialGuess, fit_seasonal};
use crate::io::ingest::{IngestedData, load_incidents, load_incidents_file};
use crate::report::{Diagnostics, compute_residuals, diagnose};

/// All computed outputs of a single `seas fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub counts: YearMonthCounts,
    pub table: MonthlyTable,
    pub observations: Vec<Observation>,
    pub fit: FitResult,
    pub residuals: Vec<ResidualRecord>,
    pub diagnostics: Diagnostics,
}

/// Load incidents from the configured source.
pub fn load_source(config: &RunConfig) -> Result<IngestedData, AppError> {
    match config.source {
        SourceKind::Nypd => {
            let client = IncidentClient::from_env(config.data_url.as_deref())?;
            let body = client.fetch_csv()?;
            load_incidents(body.as_bytes())
        }
        SourceKind::Csv => {
            let path = config
                .csv_path
                .as_deref()
                .ok_or_else(|| AppError::new(2, "--source csv requires --file <CSV>."))?;
            info!(path = %path.display(), "loading incident CSV");
            load_incidents_file(path)
        }
        SourceKind::Synthetic => {
            let incidents = generate_incidents(&config.synthetic)?;
            let n = incidents.len();
            if n == 0 {
                return Err(AppError::new(3, "Synthetic source produced no incidents."));
            }
            Ok(IngestedData {
                incidents,
                row_errors: Vec::new(),
                rows_read: n,
                rows_used: n,
            })
        }
    }
}

/// Group loaded incidents into the 12-row monthly table.
pub fn aggregate(
    ingest: &IngestedData,
    config: &RunConfig,
) -> Result<(YearMonthCounts, MonthlyTable), AppError> {
    let counts = count_by_year_month(
        &ingest.incidents,
        config.unit,
        (config.year_min, config.year_max),
    )?;
    let table = monthly_table(&counts, config.statistic)?;
    Ok((counts, table))
}

/// Optimizer settings from the run configuration.
pub fn fit_options(config: &RunConfig) -> FitOptions {
    FitOptions {
        max_iterations: config.max_iterations,
        rel_tolerance: config.tolerance,
        ..FitOptions::default()
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingest = load_source(config)?;
    run_with_incidents(config, ingest)
}

/// Execute the pipeline with already-loaded incidents.
///
/// The TUI uses this to refit (new statistic or unit) without re-downloading.
pub fn run_with_incidents(config: &RunConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let (counts, table) = aggregate(&ingest, config)?;
    let observations = table.observations();

    let guess = InitialGuess::from_observations(&observations).with_overrides(
        config.amplitude0,
        config.phase0,
        config.midline0,
    );
    let fit = fit_seasonal(&observations, guess, &fit_options(config))?;
    info!(
        amplitude = fit.params.amplitude,
        phase = fit.params.phase,
        midline = fit.params.midline,
        iterations = fit.quality.iterations,
        "seasonal fit converged"
    );

    let residuals = compute_residuals(&observations, &fit)?;
    let diagnostics = diagnose(&table, &residuals);

    Ok(RunOutput {
        ingest,
        counts,
        table,
        observations,
        fit,
        residuals,
        diagnostics,
    })
}
