//! Markdown run report: provenance, monthly table, fit, residuals, diagnostics.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::app::pipeline::RunOutput;
use crate::domain::{RunConfig, month_abbrev};
use crate::error::AppError;
use crate::models::peak_month;
use crate::report::diagnostics::AnomalyKind;
use crate::report::format::{fmt_opt, fmt_p};

/// Write the report for one run to `path`.
pub fn write_markdown_report(path: &Path, run: &RunOutput, config: &RunConfig) -> Result<(), AppError> {
    let text = render_markdown(run, config, &Local::now().to_rfc3339());

    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report '{}': {e}", path.display())))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write report: {e}")))?;

    info!(path = %path.display(), "wrote markdown report");
    Ok(())
}

/// Render the report body; `generated` is the timestamp line.
pub fn render_markdown(run: &RunOutput, config: &RunConfig, generated: &str) -> String {
    let table = &run.table;
    let fit = &run.fit;
    let mut out = String::new();

    out.push_str("# Seasonal incident fit\n\n");
    out.push_str(&format!("- generated: {generated}\n"));
    out.push_str(&format!("- source: {:?}\n", config.source));
    if let Some(url) = &config.data_url {
        out.push_str(&format!("- url: {url}\n"));
    }
    if let Some(p) = &config.csv_path {
        out.push_str(&format!("- file: {}\n", p.display()));
    }
    out.push_str(&format!(
        "- rows: read={} used={} skipped={}\n",
        run.ingest.rows_read,
        run.ingest.rows_used,
        run.ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "- years: {}-{}\n- unit: {:?}\n- statistic: {}\n- total counted: {}\n",
        table.first_year,
        table.last_year,
        table.unit,
        table.statistic.display_name(),
        table.total_count
    ));

    out.push_str("\n## Monthly table\n\n");
    out.push_str("| month | years | mean | variance | min | max |\n");
    out.push_str("| - | - | - | - | - | - |\n");
    for r in &table.rows {
        out.push_str(&format!(
            "| {} | {} | {:.4} | {} | {:.3} | {:.3} |\n",
            month_abbrev(r.month),
            r.n_years,
            r.mean,
            fmt_opt(r.variance, 4),
            r.min,
            r.max
        ));
    }

    out.push_str("\n## Fit\n\n");
    out.push_str("`value(month) = a*sin(2*pi*month/12 + c) + d`\n\n");
    out.push_str("| param | estimate | std_error | t | p |\n");
    out.push_str("| - | - | - | - | - |\n");
    for (name, est) in fit.estimates() {
        out.push_str(&format!(
            "| {name} | {:.6} | {} | {} | {} |\n",
            est.estimate,
            fmt_opt(est.std_error, 6),
            fmt_opt(est.t_value, 3),
            fmt_p(est.p_value)
        ));
    }
    let q = &fit.quality;
    out.push_str(&format!(
        "\nSSE={:.6}, RMSE={:.6}, residual s.e.={:.6}, df={}, iterations={} ({})\n",
        q.sse,
        q.rmse,
        q.residual_std_error,
        q.df,
        q.iterations,
        q.stop.display_name()
    ));
    if let Some(m) = peak_month(&fit.params) {
        out.push_str(&format!("\nPeak month: {m:.2}\n"));
    }

    out.push_str("\n## Residuals\n\n");
    out.push_str("| month | observed | predicted | residual |\n");
    out.push_str("| - | - | - | - |\n");
    for r in &run.residuals {
        out.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.4} |\n",
            month_abbrev(r.month),
            r.observed,
            r.predicted,
            r.residual
        ));
    }

    let d = &run.diagnostics;
    out.push_str("\n## Diagnostics\n\n");
    if let Some(s) = &d.summary {
        out.push_str(&format!(
            "- residual mean {:.4}, sd {}, largest |r| {:.4} in {}\n",
            s.mean,
            fmt_opt(s.std_dev, 4),
            s.max_abs,
            month_abbrev(s.max_abs_month)
        ));
    }
    out.push_str(&format!(
        "- normal QQ correlation: {}\n",
        fmt_opt(d.qq_correlation, 4)
    ));
    out.push_str(&format!(
        "- variance vs predicted correlation: {}\n",
        fmt_opt(d.variance_correlation, 4)
    ));
    for a in &d.variance_anomalies {
        let word = match a.kind {
            AnomalyKind::Low => "Low",
            AnomalyKind::High => "High",
        };
        out.push_str(&format!(
            "- {word} variance in {} ({:.2}x the median); the fit is unweighted\n",
            month_abbrev(a.month),
            a.ratio
        ));
    }

    out
}
