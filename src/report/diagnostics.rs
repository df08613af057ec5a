//! Residual diagnostics for the seasonal fit.
//!
//! - residual summary (mean should sit near zero for an adequate model)
//! - normal QQ points and the probability-plot correlation
//! - across-year variance vs. predicted value (count data tends to have
//!   variance growing with the mean)
//! - months whose variance is far from the typical month
//!
//! Nothing here feeds back into the fit.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::{MonthlyTable, ResidualRecord};
use crate::math::{mean, median, normal_quantile, pearson, ppoints, sample_variance};

/// Variance below `LOW_RATIO × median` or above `HIGH_RATIO × median` is flagged.
pub const LOW_RATIO: f64 = 0.5;
pub const HIGH_RATIO: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualSummary {
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two residuals.
    pub std_dev: Option<f64>,
    pub max_abs: f64,
    pub max_abs_month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QqPoint {
    pub theoretical: f64,
    pub sample: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariancePoint {
    pub month: u32,
    pub predicted: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceAnomaly {
    pub month: u32,
    pub variance: f64,
    /// `variance / median variance`.
    pub ratio: f64,
    pub kind: AnomalyKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub summary: Option<ResidualSummary>,
    pub qq: Vec<QqPoint>,
    pub qq_correlation: Option<f64>,
    pub variance_points: Vec<VariancePoint>,
    pub variance_correlation: Option<f64>,
    pub median_variance: Option<f64>,
    pub variance_anomalies: Vec<VarianceAnomaly>,
}

/// Diagnose residuals against the monthly table they came from.
pub fn diagnose(table: &MonthlyTable, residuals: &[ResidualRecord]) -> Diagnostics {
    let qq = qq_points(residuals);
    let (qx, qy): (Vec<f64>, Vec<f64>) = qq.iter().map(|p| (p.theoretical, p.sample)).unzip();

    let variance_points: Vec<VariancePoint> = residuals
        .iter()
        .filter_map(|r| {
            let variance = table.row(r.month)?.variance?;
            variance.is_finite().then_some(VariancePoint {
                month: r.month,
                predicted: r.predicted,
                variance,
            })
        })
        .collect();
    let (vx, vy): (Vec<f64>, Vec<f64>) = variance_points
        .iter()
        .map(|p| (p.predicted, p.variance))
        .unzip();

    let median_variance = median(&vy);
    let variance_anomalies = match median_variance {
        Some(med) if med > 0.0 => variance_points
            .iter()
            .filter_map(|p| {
                let ratio = p.variance / med;
                let kind = if ratio < LOW_RATIO {
                    AnomalyKind::Low
                } else if ratio > HIGH_RATIO {
                    AnomalyKind::High
                } else {
                    return None;
                };
                Some(VarianceAnomaly {
                    month: p.month,
                    variance: p.variance,
                    ratio,
                    kind,
                })
            })
            .collect(),
        _ => Vec::new(),
    };

    Diagnostics {
        summary: summarize(residuals),
        qq_correlation: pearson(&qx, &qy),
        qq,
        variance_correlation: pearson(&vx, &vy),
        variance_points,
        median_variance,
        variance_anomalies,
    }
}

/// Mean, spread and the worst month of the residuals.
pub fn summarize(residuals: &[ResidualRecord]) -> Option<ResidualSummary> {
    let values: Vec<f64> = residuals.iter().map(|r| r.residual).collect();
    let worst = residuals.iter().max_by(|a, b| {
        a.residual
            .abs()
            .partial_cmp(&b.residual.abs())
            .unwrap_or(Ordering::Equal)
    })?;
    Some(ResidualSummary {
        mean: mean(&values)?,
        std_dev: sample_variance(&values).map(f64::sqrt),
        max_abs: worst.residual.abs(),
        max_abs_month: worst.month,
    })
}

/// Sorted residuals against standard normal quantiles at `ppoints(n)`.
pub fn qq_points(residuals: &[ResidualRecord]) -> Vec<QqPoint> {
    let mut sorted: Vec<f64> = residuals.iter().map(|r| r.residual).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    ppoints(sorted.len())
        .into_iter()
        .zip(sorted)
        .map(|(p, sample)| QqPoint {
            theoretical: normal_quantile(p),
            sample,
        })
        .collect()
}
