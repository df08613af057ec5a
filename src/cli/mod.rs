//! Command-line parsing for the seasonal incident fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{CountUnit, SourceKind, Statistic};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "seas", version, about = "Seasonal incident curve fitter (NYPD shootings)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the seasonal sinusoid, print parameters/residuals/diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Print the per-calendar-month aggregate table only.
    Months(FitArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same pipeline as `seas fit`, but renders the fit and its
    /// diagnostics as charts using Ratatui.
    Tui(FitArgs),
}

/// Common options for loading, aggregating and fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Where incidents come from (defaults to `csv` when --file is given, else `nypd`).
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Incident CSV on disk (NYPD column names: OCCUR_DATE, OCCUR_TIME, INCIDENT_KEY).
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Override the download URL for `--source nypd`.
    #[arg(long, env = "SEAS_DATA_URL")]
    pub url: Option<String>,

    /// Monthly value averaged across years.
    #[arg(long, value_enum, default_value_t = Statistic::Count)]
    pub statistic: Statistic,

    /// Count distinct incidents or victim rows.
    #[arg(long, value_enum, default_value_t = CountUnit::Incident)]
    pub unit: CountUnit,

    /// First year to include (inclusive).
    #[arg(long)]
    pub year_min: Option<i32>,

    /// Last year to include (inclusive).
    #[arg(long)]
    pub year_max: Option<i32>,

    /// Levenberg-Marquardt iteration cap.
    #[arg(long = "max-iter", default_value_t = 200)]
    pub max_iter: usize,

    /// Relative SSE reduction below which the fit stops.
    #[arg(long, default_value_t = 1e-10)]
    pub tolerance: f64,

    /// Initial amplitude (default: half the observed range).
    #[arg(long, allow_negative_numbers = true)]
    pub amplitude0: Option<f64>,

    /// Initial phase in radians (default: 0).
    #[arg(long, allow_negative_numbers = true)]
    pub phase0: Option<f64>,

    /// Initial midline (default: observed mean).
    #[arg(long, allow_negative_numbers = true)]
    pub midline0: Option<f64>,

    /// Random seed for the synthetic source.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First year generated by the synthetic source.
    #[arg(long, default_value_t = 2010)]
    pub synthetic_start: i32,

    /// Number of whole years generated by the synthetic source.
    #[arg(long, default_value_t = 10)]
    pub synthetic_years: u32,

    /// Mean incidents per month for the synthetic source.
    #[arg(long, default_value_t = 120.0)]
    pub synthetic_base: f64,

    /// Relative seasonal swing for the synthetic source (0.25 = +/-25%).
    #[arg(long, default_value_t = 0.25)]
    pub synthetic_amplitude: f64,

    /// Phase (radians) of the synthetic seasonal swing.
    #[arg(long, default_value_t = -1.6, allow_negative_numbers = true)]
    pub synthetic_phase: f64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export per-month residuals to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (parameters + inference + fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,

    /// Write a Markdown report of the run.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `seas fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fit_flags() {
        let cli = Cli::try_parse_from([
            "seas",
            "fit",
            "--source",
            "synthetic",
            "--statistic",
            "log-count",
            "--unit",
            "victim",
            "--phase0",
            "-0.5",
            "--no-plot",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.source, Some(SourceKind::Synthetic));
        assert_eq!(args.statistic, Statistic::LogCount);
        assert_eq!(args.unit, CountUnit::Victim);
        assert_eq!(args.phase0, Some(-0.5));
        assert!(args.no_plot);
        assert_eq!(args.max_iter, 200);
    }

    #[test]
    fn plot_requires_fit_file() {
        assert!(Cli::try_parse_from(["seas", "plot"]).is_err());
        assert!(Cli::try_parse_from(["seas", "plot", "--fit", "fit.json"]).is_ok());
    }
}
