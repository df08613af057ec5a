//! Export per-month residuals to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::domain::{MonthlyTable, ResidualRecord};
use crate::error::AppError;

/// Write one row per month: observed, predicted, residual and the
/// across-year variance behind the observation.
pub fn write_residuals_csv(
    path: &Path,
    residuals: &[ResidualRecord],
    table: &MonthlyTable,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residuals(file, residuals, table)?;
    info!(path = %path.display(), rows = residuals.len(), "wrote residual CSV");
    Ok(())
}

/// Same as [`write_residuals_csv`] but to any writer.
pub fn write_residuals<W: Write>(
    mut out: W,
    residuals: &[ResidualRecord],
    table: &MonthlyTable,
) -> Result<(), AppError> {
    writeln!(out, "month,observed,predicted,residual,variance,n_years")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        let row = table.row(r.month);
        let variance = row
            .and_then(|s| s.variance)
            .map(|v| format!("{v:.6}"))
            .unwrap_or_default();
        let n_years = row.map(|s| s.n_years).unwrap_or(0);
        writeln!(
            out,
            "{},{:.6},{:.6},{:.6},{},{}",
            r.month, r.observed, r.predicted, r.residual, variance, n_years
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CountUnit, MonthlyStat, Statistic};

    fn table() -> MonthlyTable {
        MonthlyTable {
            statistic: Statistic::Count,
            unit: CountUnit::Incident,
            rows: vec![
                MonthlyStat {
                    month: 1,
                    n_years: 3,
                    mean: 10.0,
                    variance: Some(1.5),
                    min: 9.0,
                    max: 11.0,
                },
                MonthlyStat {
                    month: 2,
                    n_years: 1,
                    mean: 12.0,
                    variance: None,
                    min: 12.0,
                    max: 12.0,
                },
            ],
            first_year: 2020,
            last_year: 2022,
            total_count: 42,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let residuals = [
            ResidualRecord {
                month: 1,
                observed: 10.0,
                predicted: 9.5,
                residual: 0.5,
            },
            ResidualRecord {
                month: 2,
                observed: 12.0,
                predicted: 12.25,
                residual: -0.25,
            },
        ];
        let mut buf = Vec::new();
        write_residuals(&mut buf, &residuals, &table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "month,observed,predicted,residual,variance,n_years");
        assert_eq!(lines[1], "1,10.000000,9.500000,0.500000,1.500000,3");
        assert_eq!(lines[2], "2,12.000000,12.250000,-0.250000,,1");
    }
}
