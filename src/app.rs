//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads incidents (download, file, or synthetic)
//! - aggregates and fits the seasonal curve
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, PlotArgs};
use crate::domain::{RunConfig, SourceKind, SyntheticConfig};
use crate::error::AppError;

pub mod pipeline;

const LOG_ENV: &str = "SEAS_LOG";

/// Entry point for the `seas` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // We want `seas` and `seas --source synthetic` to behave like `seas tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Months(args) => handle_months(&args),
        Command::Plot(args) => handle_plot(&args),
        Command::Tui(args) => handle_tui(&args),
    }
}

/// stderr subscriber filtered by `SEAS_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.table, &run.fit, &config)
    );
    println!("{}", crate::report::format_parameter_table(&run.fit));
    println!("{}", crate::report::format_residual_table(&run.residuals));
    println!("{}", crate::report::format_diagnostics(&run.diagnostics));

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.residuals,
            &run.fit,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
        let scatter = crate::plot::render_residual_plot(
            &run.residuals,
            config.plot_width,
            (config.plot_height / 2).max(5),
        );
        println!("{scatter}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_residuals_csv(path, &run.residuals, &run.table)?;
    }
    if let Some(path) = &config.export_fit {
        crate::io::fitfile::write_fit_json(path, &run.table, &run.fit)?;
    }
    if let Some(path) = &config.report_path {
        crate::report::write_markdown_report(path, &run, &config)?;
    }

    Ok(())
}

fn handle_months(args: &FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    let ingest = pipeline::load_source(&config)?;
    let (_, table) = pipeline::aggregate(&ingest, &config)?;

    println!(
        "Years {}-{} | unit={:?} | {}\n",
        table.first_year,
        table.last_year,
        table.unit,
        table.statistic.display_name()
    );
    println!("{}", crate::report::format_monthly_table(&table));
    Ok(())
}

fn handle_tui(args: &FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args)?;
    crate::tui::run(config)
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let file = crate::io::fitfile::read_fit_json(&args.fit)?;
    let plot = crate::plot::render_ascii_plot_from_fit_file(&file, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Collapse CLI flags into one `RunConfig`, validating what clap cannot.
pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let source = match (args.source, &args.file) {
        (Some(s), _) => s,
        (None, Some(_)) => SourceKind::Csv,
        (None, None) => SourceKind::Nypd,
    };
    if source == SourceKind::Csv && args.file.is_none() {
        return Err(AppError::new(2, "--source csv requires --file <CSV>."));
    }
    if args.max_iter == 0 {
        return Err(AppError::new(2, "--max-iter must be > 0."));
    }
    if !(args.tolerance.is_finite() && args.tolerance > 0.0) {
        return Err(AppError::new(2, "--tolerance must be finite and > 0."));
    }
    if let (Some(lo), Some(hi)) = (args.year_min, args.year_max) {
        if lo > hi {
            return Err(AppError::new(2, format!("--year-min {lo} is after --year-max {hi}.")));
        }
    }

    Ok(RunConfig {
        source,
        csv_path: args.file.clone(),
        data_url: args.url.clone(),
        statistic: args.statistic,
        unit: args.unit,
        year_min: args.year_min,
        year_max: args.year_max,
        max_iterations: args.max_iter,
        tolerance: args.tolerance,
        amplitude0: args.amplitude0,
        phase0: args.phase0,
        midline0: args.midline0,
        synthetic: SyntheticConfig {
            seed: args.seed,
            start_year: args.synthetic_start,
            years: args.synthetic_years,
            base: args.synthetic_base,
            amplitude: args.synthetic_amplitude,
            phase: args.synthetic_phase,
        },
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_fit: args.export_fit.clone(),
        report_path: args.report.clone(),
    })
}

/// Rewrite argv so `seas` defaults to `seas tui`.
///
/// Rules:
/// - `seas`                       -> `seas tui`
/// - `seas --source csv ...`      -> `seas tui --source csv ...`
/// - `seas --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "months" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn fit_args(parts: &[&str]) -> FitArgs {
        let mut full = vec!["seas", "fit"];
        full.extend_from_slice(parts);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Fit(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_becomes_tui() {
        assert_eq!(rewrite_args(argv(&["seas"])), argv(&["seas", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["seas", "--source", "synthetic"])),
            argv(&["seas", "tui", "--source", "synthetic"])
        );
        assert_eq!(rewrite_args(argv(&["seas", "--help"])), argv(&["seas", "--help"]));
        assert_eq!(rewrite_args(argv(&["seas", "fit"])), argv(&["seas", "fit"]));
    }

    #[test]
    fn file_flag_implies_csv_source() {
        let config = run_config_from_args(&fit_args(&["--file", "shootings.csv"])).unwrap();
        assert_eq!(config.source, SourceKind::Csv);

        let config = run_config_from_args(&fit_args(&["--source", "synthetic"])).unwrap();
        assert_eq!(config.source, SourceKind::Synthetic);
        assert_eq!(config.synthetic.years, 10);
        assert!(config.plot);
    }

    #[test]
    fn invalid_flags_are_usage_errors() {
        let err = run_config_from_args(&fit_args(&["--source", "csv"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = run_config_from_args(&fit_args(&["--year-min", "2020", "--year-max", "2019"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = run_config_from_args(&fit_args(&["--max-iter", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
