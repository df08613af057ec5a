//! Read/write fit JSON files.
//!
//! A fit file is the portable representation of a seasonal fit:
//! - statistic, count unit and year span of the aggregated data
//! - the observations and the full `FitResult`
//! - a precomputed dense grid over months 1..12 for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::domain::{FitFile, FitGrid, FitResult, MonthlyTable};
use crate::error::AppError;
use crate::models::predict;

const TOOL_NAME: &str = "seas";
const GRID_POINTS: usize = 111;

/// Assemble the fit file for a table and its fit.
pub fn build_fit_file(table: &MonthlyTable, fit: &FitResult) -> FitFile {
    FitFile {
        tool: TOOL_NAME.to_string(),
        statistic: table.statistic,
        unit: table.unit,
        first_year: table.first_year,
        last_year: table.last_year,
        observations: table.observations(),
        fit: fit.clone(),
        grid: build_grid(fit, GRID_POINTS),
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, table: &MonthlyTable, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &build_fit_file(table, fit))
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    info!(path = %path.display(), "wrote fit JSON");
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    if fit.grid.month.len() != fit.grid.value.len() {
        return Err(AppError::new(2, "Invalid fit JSON: grid month/value lengths differ."));
    }
    Ok(fit)
}

/// Evenly spaced months over [1, 12] with the fitted value at each.
pub fn build_grid(fit: &FitResult, n: usize) -> FitGrid {
    let n = n.max(2);
    let mut month = Vec::with_capacity(n);
    let mut value = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let m = 1.0 + 11.0 * u;
        month.push(m);
        value.push(predict(&fit.params, m));
    }
    FitGrid { month, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CountUnit, MonthlyStat, Observation, Statistic};
    use crate::fit::{FitOptions, fit_observations};

    fn table() -> MonthlyTable {
        let rows = (1..=12)
            .map(|m| {
                let mean = 4.0 * crate::models::month_angle(m as f64).sin() + 30.0;
                MonthlyStat {
                    month: m,
                    n_years: 2,
                    mean,
                    variance: Some(1.0),
                    min: mean - 1.0,
                    max: mean + 1.0,
                }
            })
            .collect();
        MonthlyTable {
            statistic: Statistic::Count,
            unit: CountUnit::Victim,
            rows,
            first_year: 2019,
            last_year: 2020,
            total_count: 720,
        }
    }

    #[test]
    fn grid_spans_the_year_and_follows_the_fit() {
        let table = table();
        let obs: Vec<Observation> = table.observations();
        let fit = fit_observations(&obs, &FitOptions::default()).unwrap();
        let grid = build_grid(&fit, 23);
        assert_eq!(grid.month.len(), 23);
        assert_eq!(grid.month[0], 1.0);
        assert_eq!(grid.month[22], 12.0);
        assert_eq!(grid.value[0], predict(&fit.params, 1.0));
    }

    #[test]
    fn write_then_read_preserves_metadata() {
        let table = table();
        let fit = fit_observations(&table.observations(), &FitOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&path, &table, &fit).unwrap();

        let back = read_fit_json(&path).unwrap();
        assert_eq!(back.tool, "seas");
        assert_eq!(back.unit, CountUnit::Victim);
        assert_eq!(back.first_year, 2019);
        assert_eq!(back.observations.len(), 12);
        assert_eq!(back.grid.month.len(), GRID_POINTS);
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = read_fit_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
