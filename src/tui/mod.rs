//! Ratatui-based terminal UI.
//!
//! Four diagnostic charts for the current fit (observed vs fitted, residual vs
//! predicted, normal QQ, variance vs predicted) with the parameter estimates in
//! the header. Incidents are loaded once; toggling the statistic or count unit
//! only re-aggregates and refits.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};
use tracing::warn;

use crate::app::pipeline::{RunOutput, load_source, run_with_incidents};
use crate::domain::{RunConfig, SourceKind, month_abbrev};
use crate::error::AppError;
use crate::io::ingest::IngestedData;
use crate::models::predict;
use crate::report::format::fmt_p;

mod plotters_chart;

use plotters_chart::DiagnosticChart;

const CURVE_POINTS: usize = 200;

/// Start the TUI.
///
/// The data is loaded before the terminal switches to the alternate screen,
/// so download and file errors print like any other CLI error.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    let ingest = load_source(&config)?;
    let mut app = App::new(config, ingest);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: RunConfig,
    ingest: IngestedData,
    run: Option<RunOutput>,
    status: String,
}

impl App {
    fn new(config: RunConfig, ingest: IngestedData) -> Self {
        let mut app = Self {
            config,
            ingest,
            run: None,
            status: String::new(),
        };
        app.refit();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('s') => {
                self.config.statistic = self.config.statistic.toggle();
                self.refit();
            }
            KeyCode::Char('u') => {
                self.config.unit = self.config.unit.toggle();
                self.refit();
            }
            KeyCode::Char('r') => self.reseed(),
            _ => {}
        }
        false
    }

    /// Synthetic source only: bump the seed and regenerate incidents.
    fn reseed(&mut self) {
        if self.config.source != SourceKind::Synthetic {
            self.status = "Reseed only applies to --source synthetic.".to_string();
            return;
        }
        self.config.synthetic.seed = self.config.synthetic.seed.wrapping_add(1);
        match load_source(&self.config) {
            Ok(ingest) => {
                self.ingest = ingest;
                self.refit();
            }
            Err(err) => {
                warn!(error = %err, "synthetic regeneration failed");
                self.status = format!("Regeneration failed: {err}");
            }
        }
    }

    /// Re-aggregate and refit; a failure keeps the UI alive with the error shown.
    fn refit(&mut self) {
        match run_with_incidents(&self.config, self.ingest.clone()) {
            Ok(run) => {
                self.status = format!(
                    "{} | unit={:?} | seed={}",
                    self.config.statistic.display_name(),
                    self.config.unit,
                    self.config.synthetic.seed
                );
                self.run = Some(run);
            }
            Err(err) => {
                warn!(error = %err, "refit failed");
                self.status = format!("Fit failed: {err}");
                self.run = None;
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("seas", Style::default().fg(Color::Cyan)),
            Span::raw(" - seasonal incident fit: a*sin(2*pi*m/12 + c) + d"),
        ]));

        lines.push(Line::from(Span::styled(
            format!(
                "source: {:?} | rows used: {} | statistic: {} | unit: {:?}",
                self.config.source,
                self.ingest.rows_used,
                self.config.statistic.display_name(),
                self.config.unit,
            ),
            Style::default().fg(Color::Gray),
        )));

        if let Some(run) = &self.run {
            let fit = &run.fit;
            lines.push(Line::from(Span::styled(
                format!(
                    "a={:.4} (p={}) | c={:.4} (p={}) | d={:.4} (p={}) | rmse={:.4} | years {}-{}",
                    fit.amplitude.estimate,
                    fmt_p(fit.amplitude.p_value),
                    fit.phase.estimate,
                    fmt_p(fit.phase.p_value),
                    fit.midline.estimate,
                    fmt_p(fit.midline.p_value),
                    fit.quality.rmse,
                    run.table.first_year,
                    run.table.last_year,
                ),
                Style::default().fg(Color::Gray),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("No fit for the current settings (see status).")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(msg, area);
            return;
        };

        let panels = [
            (top[0], fitted_series(run)),
            (top[1], residual_series(run)),
            (bottom[0], qq_series(run)),
            (bottom[1], variance_series(run)),
        ];
        for (rect, data) in panels {
            draw_chart(frame, rect, &data);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "s statistic  u unit  r reseed  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Series and bounds for one chart panel.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    title: String,
    line: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    highlight: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_label: &'static str,
    y_label: &'static str,
}

fn draw_chart(frame: &mut ratatui::Frame<'_>, area: Rect, data: &ChartData) {
    let block = Block::default().title(data.title.as_str()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let widget = DiagnosticChart {
        line: &data.line,
        points: &data.points,
        highlight: &data.highlight,
        x_bounds: data.x_bounds,
        y_bounds: data.y_bounds,
        x_label: data.x_label,
        y_label: data.y_label,
        fmt_x: fmt_axis,
        fmt_y: fmt_axis,
    };
    frame.render_widget(widget, inner);
}

/// Observed monthly values with the fitted curve; variance anomalies highlighted.
fn fitted_series(run: &RunOutput) -> ChartData {
    let line: Vec<(f64, f64)> = (0..CURVE_POINTS)
        .map(|i| {
            let m = 1.0 + 11.0 * i as f64 / (CURVE_POINTS as f64 - 1.0);
            (m, predict(&run.fit.params, m))
        })
        .collect();
    let points: Vec<(f64, f64)> = run
        .observations
        .iter()
        .map(|o| (o.month as f64, o.value))
        .collect();
    let highlight: Vec<(f64, f64)> = run
        .diagnostics
        .variance_anomalies
        .iter()
        .filter_map(|a| points.iter().find(|p| p.0 == a.month as f64).copied())
        .collect();

    let y_bounds = padded_bounds(points.iter().chain(line.iter()).map(|p| p.1));
    let title = match crate::models::peak_month(&run.fit.params) {
        Some(m) => format!("Observed vs fitted (peak {})", month_abbrev(m.round() as u32)),
        None => "Observed vs fitted".to_string(),
    };
    ChartData {
        title,
        line,
        points,
        highlight,
        x_bounds: [1.0, 12.0],
        y_bounds,
        x_label: "month",
        y_label: run.table.statistic.display_name(),
    }
}

/// Residual vs predicted with the zero line.
fn residual_series(run: &RunOutput) -> ChartData {
    let points: Vec<(f64, f64)> = run
        .residuals
        .iter()
        .map(|r| (r.predicted, r.residual))
        .collect();
    let x_bounds = padded_bounds(points.iter().map(|p| p.0));
    let y_bounds = padded_bounds(points.iter().map(|p| p.1).chain(std::iter::once(0.0)));
    ChartData {
        title: "Residual vs predicted".to_string(),
        line: vec![(x_bounds[0], 0.0), (x_bounds[1], 0.0)],
        points,
        highlight: Vec::new(),
        x_bounds,
        y_bounds,
        x_label: "predicted",
        y_label: "residual",
    }
}

/// Normal QQ points with the `mean + sd * z` reference line.
fn qq_series(run: &RunOutput) -> ChartData {
    let d = &run.diagnostics;
    let points: Vec<(f64, f64)> = d.qq.iter().map(|p| (p.theoretical, p.sample)).collect();
    let x_bounds = padded_bounds(points.iter().map(|p| p.0));

    let line = match &d.summary {
        Some(s) => {
            let sd = s.std_dev.unwrap_or(0.0);
            vec![
                (x_bounds[0], s.mean + sd * x_bounds[0]),
                (x_bounds[1], s.mean + sd * x_bounds[1]),
            ]
        }
        None => Vec::new(),
    };
    let y_bounds = padded_bounds(points.iter().chain(line.iter()).map(|p| p.1));
    let title = match d.qq_correlation {
        Some(r) => format!("Normal QQ (r={r:.3})"),
        None => "Normal QQ".to_string(),
    };
    ChartData {
        title,
        line,
        points,
        highlight: Vec::new(),
        x_bounds,
        y_bounds,
        x_label: "normal quantile",
        y_label: "residual",
    }
}

/// Across-year variance vs predicted; anomalous months highlighted.
fn variance_series(run: &RunOutput) -> ChartData {
    let d = &run.diagnostics;
    let points: Vec<(f64, f64)> = d
        .variance_points
        .iter()
        .map(|p| (p.predicted, p.variance))
        .collect();
    let highlight: Vec<(f64, f64)> = d
        .variance_anomalies
        .iter()
        .filter_map(|a| {
            d.variance_points
                .iter()
                .find(|p| p.month == a.month)
                .map(|p| (p.predicted, p.variance))
        })
        .collect();
    let title = match d.variance_correlation {
        Some(r) => format!("Variance vs predicted (r={r:.3})"),
        None => "Variance vs predicted".to_string(),
    };
    ChartData {
        title,
        line: Vec::new(),
        x_bounds: padded_bounds(points.iter().map(|p| p.0)),
        y_bounds: padded_bounds(points.iter().map(|p| p.1)),
        points,
        highlight,
        x_label: "predicted",
        y_label: "variance",
    }
}

/// Finite min/max with 5% padding; `[0, 1]` when nothing usable is left.
fn padded_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return [0.0, 1.0];
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    [lo - pad, hi + pad]
}

fn fmt_axis(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CountUnit, Statistic, SyntheticConfig};

    fn config() -> RunConfig {
        RunConfig {
            source: SourceKind::Synthetic,
            csv_path: None,
            data_url: None,
            statistic: Statistic::Count,
            unit: CountUnit::Incident,
            year_min: None,
            year_max: None,
            max_iterations: 200,
            tolerance: 1e-10,
            amplitude0: None,
            phase0: None,
            midline0: None,
            synthetic: SyntheticConfig {
                seed: 3,
                start_year: 2015,
                years: 6,
                base: 90.0,
                amplitude: 0.3,
                phase: -1.6,
            },
            plot: false,
            plot_width: 72,
            plot_height: 20,
            export_results: None,
            export_fit: None,
            report_path: None,
        }
    }

    fn app() -> App {
        let config = config();
        let ingest = load_source(&config).unwrap();
        App::new(config, ingest)
    }

    #[test]
    fn padded_bounds_handles_degenerate_input() {
        assert_eq!(padded_bounds(std::iter::empty()), [0.0, 1.0]);
        let [lo, hi] = padded_bounds([5.0, 5.0].into_iter());
        assert!(lo < 5.0 && hi > 5.0);
        let [lo, hi] = padded_bounds([0.0, 10.0, f64::NAN].into_iter());
        assert_eq!([lo, hi], [-0.5, 10.5]);
    }

    #[test]
    fn series_cover_all_months() {
        let app = app();
        let run = app.run.as_ref().unwrap();
        let fitted = fitted_series(run);
        assert_eq!(fitted.points.len(), 12);
        assert_eq!(fitted.line.len(), CURVE_POINTS);
        assert_eq!(fitted.x_bounds, [1.0, 12.0]);
        assert_eq!(residual_series(run).points.len(), 12);
        assert_eq!(qq_series(run).points.len(), 12);
        assert_eq!(variance_series(run).points.len(), 12);
    }

    #[test]
    fn keys_toggle_settings_and_refit() {
        let mut app = app();
        assert!(!app.handle_key(KeyCode::Char('s')));
        assert_eq!(app.config.statistic, Statistic::LogCount);
        assert!(app.run.is_some());
        assert_eq!(app.run.as_ref().unwrap().table.statistic, Statistic::LogCount);

        app.handle_key(KeyCode::Char('u'));
        assert_eq!(app.config.unit, CountUnit::Victim);

        let before = app.ingest.incidents.clone();
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.config.synthetic.seed, 4);
        assert_ne!(app.ingest.incidents, before);
        assert!(app.run.is_some());

        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
