//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed monthly values: `o`
//! - fitted curve: `-` line
//! - residual scatter: `*` with the zero line drawn as `.`

use crate::domain::{FitFile, FitResult, Observation, ResidualRecord};
use crate::models::predict;

const MONTH_MIN: f64 = 1.0;
const MONTH_MAX: f64 = 12.0;

/// Observed values and the fitted curve over months 1..12.
pub fn render_ascii_plot(residuals: &[ResidualRecord], fit: &FitResult, width: usize, height: usize) -> String {
    let curve = sample_curve(fit, width.max(2));
    let points: Vec<(f64, f64)> = residuals
        .iter()
        .map(|r| (r.month as f64, r.observed))
        .collect();
    render_month_plot(&points, &curve, width, height)
}

/// Plot a saved fit file: its grid plus the stored observations.
pub fn render_ascii_plot_from_fit_file(file: &FitFile, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = file
        .grid
        .month
        .iter()
        .zip(file.grid.value.iter())
        .map(|(&m, &v)| (m, v))
        .collect();
    let points: Vec<(f64, f64)> = file
        .observations
        .iter()
        .map(|o: &Observation| (o.month as f64, o.value))
        .collect();
    render_month_plot(&points, &curve, width, height)
}

/// Residual vs. predicted scatter (look for funnels and trends).
pub fn render_residual_plot(residuals: &[ResidualRecord], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let xs: Vec<f64> = residuals.iter().map(|r| r.predicted).collect();
    let mut ys: Vec<f64> = residuals.iter().map(|r| r.residual).collect();
    ys.push(0.0);

    let (x_min, x_max) = value_range(&xs).unwrap_or((0.0, 1.0));
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);
    let (y_min, y_max) = value_range(&ys).unwrap_or((-1.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let zero = map_y(0.0, y_min, y_max, height);
    for cell in grid[zero].iter_mut() {
        *cell = '.';
    }
    for r in residuals {
        let x = map_x(r.predicted, x_min, x_max, width);
        let y = map_y(r.residual, y_min, y_max, height);
        grid[y][x] = '*';
    }

    let mut out = format!(
        "Residuals: predicted=[{x_min:.2}, {x_max:.2}] | residual=[{y_min:.2}, {y_max:.2}]\n"
    );
    push_grid(&mut out, grid);
    out
}

fn render_month_plot(points: &[(f64, f64)], curve: &[(f64, f64)], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let ys: Vec<f64> = points
        .iter()
        .chain(curve.iter())
        .map(|&(_, y)| y)
        .collect();
    let (y_min, y_max) = value_range(&ys).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, y_min, y_max);

    for &(m, y) in points {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(m, MONTH_MIN, MONTH_MAX, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = 'o';
    }

    let mut out = format!("Plot: month=[1, 12] | y=[{y_min:.2}, {y_max:.2}]\n");
    push_grid(&mut out, grid);
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
}

fn sample_curve(fit: &FitResult, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let m = MONTH_MIN + u * (MONTH_MAX - MONTH_MIN);
            (m, predict(&fit.params, m))
        })
        .collect()
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = if span > 0.0 { span * frac } else { 0.5_f64.max(min.abs() * frac) };
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    if width == 0 {
        return;
    }

    let mut prev = None;
    for &(m, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(m, MONTH_MIN, MONTH_MAX, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, '-'),
            None => grid[yy][x] = '-',
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
