//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (the tests below pin the layouts)

use crate::domain::{
    FitResult, MonthlyTable, ParamEstimate, ResidualRecord, RunConfig, SourceKind, month_abbrev,
};
use crate::io::ingest::IngestedData;
use crate::models::peak_month;
use crate::report::diagnostics::{AnomalyKind, Diagnostics};

/// Dataset provenance, aggregation settings and fit quality.
pub fn format_run_summary(
    ingest: &IngestedData,
    table: &MonthlyTable,
    fit: &FitResult,
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== seas - Seasonal Incident Fit ===\n");
    out.push_str(&format!("Source: {}\n", source_label(config)));
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Years: {}-{} | unit={:?} | total={}\n",
        table.first_year, table.last_year, table.unit, table.total_count
    ));
    out.push_str(&format!("Statistic: {}\n", table.statistic.display_name()));

    let q = &fit.quality;
    out.push_str("\nFit:\n");
    out.push_str(&format!(
        "- model: value = a*sin(2*pi*month/12 + c) + d (n={}, df={})\n",
        q.n, q.df
    ));
    out.push_str(&format!(
        "- SSE={:.6} RMSE={:.6} residual s.e.={:.6}\n",
        q.sse, q.rmse, q.residual_std_error
    ));
    out.push_str(&format!(
        "- converged after {} iterations ({})\n",
        q.iterations,
        q.stop.display_name()
    ));
    match peak_month(&fit.params) {
        Some(m) => out.push_str(&format!("- peak at month {m:.2} ({})\n", month_abbrev(m.round() as u32))),
        None => out.push_str("- flat curve (no peak)\n"),
    }
    out.push('\n');

    out
}

fn source_label(config: &RunConfig) -> String {
    match config.source {
        SourceKind::Nypd => format!(
            "NYPD shooting incidents ({})",
            config.data_url.as_deref().unwrap_or("default URL")
        ),
        SourceKind::Csv => format!(
            "CSV {}",
            config
                .csv_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ),
        SourceKind::Synthetic => format!(
            "synthetic (seed={}, years={}, base={:.1}, amplitude={:.2}, phase={:.2})",
            config.synthetic.seed,
            config.synthetic.years,
            config.synthetic.base,
            config.synthetic.amplitude,
            config.synthetic.phase
        ),
    }
}

/// Estimates with standard errors, t-statistics and p-values.
pub fn format_parameter_table(fit: &FitResult) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<10} {:>12} {:>12} {:>10} {:>10}",
            "param", "estimate", "std_error", "t", "p"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<10} {:-<12} {:-<12} {:-<10} {:-<10}", "", "", "", "", ""),
    );
    for (name, est) in fit.estimates() {
        push_line(&mut out, format_estimate_row(name, est));
    }
    out
}

fn format_estimate_row(name: &str, est: &ParamEstimate) -> String {
    format!(
        "{:<10} {:>12.6} {:>12} {:>10} {:>10}",
        name,
        est.estimate,
        fmt_opt(est.std_error, 6),
        fmt_opt(est.t_value, 3),
        fmt_p(est.p_value)
    )
}

/// Per-calendar-month aggregate table.
pub fn format_monthly_table(table: &MonthlyTable) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<5} {:>7} {:>12} {:>12} {:>10} {:>10}",
            "month", "years", "mean", "variance", "min", "max"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<5} {:-<7} {:-<12} {:-<12} {:-<10} {:-<10}", "", "", "", "", "", ""),
    );
    for r in &table.rows {
        push_line(
            &mut out,
            format!(
                "{:<5} {:>7} {:>12.4} {:>12} {:>10.3} {:>10.3}",
                month_abbrev(r.month),
                r.n_years,
                r.mean,
                fmt_opt(r.variance, 4),
                r.min,
                r.max
            ),
        );
    }
    out
}

/// Observed vs. predicted per month.
pub fn format_residual_table(residuals: &[ResidualRecord]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:<5} {:>12} {:>12} {:>12}", "month", "observed", "predicted", "residual"),
    );
    push_line(&mut out, format!("{:-<5} {:-<12} {:-<12} {:-<12}", "", "", "", ""));
    for r in residuals {
        push_line(
            &mut out,
            format!(
                "{:<5} {:>12.4} {:>12.4} {:>12.4}",
                month_abbrev(r.month),
                r.observed,
                r.predicted,
                r.residual
            ),
        );
    }
    out
}

/// Residual summary, QQ correlation, variance checks.
pub fn format_diagnostics(diag: &Diagnostics) -> String {
    let mut out = String::from("Diagnostics:\n");

    if let Some(s) = &diag.summary {
        out.push_str(&format!(
            "- residuals: mean={:.4} sd={} max|r|={:.4} ({})\n",
            s.mean,
            fmt_opt(s.std_dev, 4),
            s.max_abs,
            month_abbrev(s.max_abs_month)
        ));
    }
    out.push_str(&format!(
        "- normal QQ correlation: {}\n",
        fmt_opt(diag.qq_correlation, 4)
    ));
    out.push_str(&format!(
        "- variance vs predicted correlation: {}\n",
        fmt_opt(diag.variance_correlation, 4)
    ));

    match diag.median_variance {
        Some(med) => {
            out.push_str(&format!("- median monthly variance: {med:.4}\n"));
            if diag.variance_anomalies.is_empty() {
                out.push_str("- no variance anomalies\n");
            }
            for a in &diag.variance_anomalies {
                let word = match a.kind {
                    AnomalyKind::Low => "low",
                    AnomalyKind::High => "high",
                };
                out.push_str(&format!(
                    "- {word} variance in {}: {:.4} ({:.2}x median, not weighted)\n",
                    month_abbrev(a.month),
                    a.variance,
                    a.ratio
                ));
            }
        }
        None => out.push_str("- variance checks need at least two years per month\n"),
    }

    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

pub(crate) fn fmt_opt(v: Option<f64>, prec: usize) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.prec$}"),
        Some(x) => format!("{x}"),
        None => "NA".to_string(),
    }
}

pub(crate) fn fmt_p(p: Option<f64>) -> String {
    match p {
        Some(p) if p < 1e-4 => format!("{p:.2e}"),
        Some(p) => format!("{p:.4}"),
        None => "NA".to_string(),
    }
}
