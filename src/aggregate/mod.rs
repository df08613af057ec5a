//! Monthly aggregation.
//!
//! Two steps, mirroring how the analysis reads the data:
//!
//! 1. `count_by_year_month`: incidents -> count per `(year, month)`, with every
//!    year-month between the first and last observed one present (gaps are 0)
//! 2. `monthly_table`: per calendar month, mean / sample variance / range of
//!    the per-year statistic (count or ln(count))
//!
//! No fitting logic here.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;
use tracing::debug;

use crate::domain::{CountUnit, IncidentRecord, MonthlyStat, MonthlyTable, Statistic};
use crate::error::AppError;
use crate::math::{mean, sample_variance};

/// Counts per `(year, month)`, ordered chronologically.
#[derive(Debug, Clone, PartialEq)]
pub struct YearMonthCounts {
    pub unit: CountUnit,
    pub counts: BTreeMap<(i32, u32), u64>,
}

impl YearMonthCounts {
    pub fn first_year(&self) -> Option<i32> {
        self.counts.keys().next().map(|(y, _)| *y)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.counts.keys().next_back().map(|(y, _)| *y)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Group incidents by `(year, month)`.
///
/// `year_range` is an inclusive filter applied before grouping.
pub fn count_by_year_month(
    incidents: &[IncidentRecord],
    unit: CountUnit,
    year_range: (Option<i32>, Option<i32>),
) -> Result<YearMonthCounts, AppError> {
    let (year_min, year_max) = year_range;
    if let (Some(lo), Some(hi)) = (year_min, year_max) {
        if lo > hi {
            return Err(AppError::new(
                2,
                format!("Invalid year range: {lo} > {hi}."),
            ));
        }
    }

    let mut counts: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut seen_keys: HashSet<(i32, u32, &str)> = HashSet::new();

    for inc in incidents {
        let year = inc.occurred.year();
        let month = inc.occurred.month();
        if year_min.is_some_and(|lo| year < lo) || year_max.is_some_and(|hi| year > hi) {
            continue;
        }

        let counts_unit = match (unit, inc.key.as_deref()) {
            // Same incident key in the same month is one incident.
            (CountUnit::Incident, Some(key)) => seen_keys.insert((year, month, key)),
            _ => true,
        };
        if counts_unit {
            *counts.entry((year, month)).or_insert(0) += 1;
        }
    }

    let (Some(&first), Some(&last)) = (counts.keys().next(), counts.keys().next_back()) else {
        return Err(AppError::new(
            3,
            "No incidents left after applying the year filter.",
        ));
    };

    // Fill gaps so months without incidents count as 0.
    let mut ym = first;
    while ym <= last {
        counts.entry(ym).or_insert(0);
        ym = next_year_month(ym);
    }

    debug!(
        first = ?first,
        last = ?last,
        year_months = counts.len(),
        "grouped incidents by year-month"
    );

    Ok(YearMonthCounts { unit, counts })
}

fn next_year_month((year, month): (i32, u32)) -> (i32, u32) {
    if month >= 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// Per-calendar-month statistics across years.
///
/// Every calendar month must have at least one year-month in the span;
/// spans shorter than 12 months are rejected.
pub fn monthly_table(counts: &YearMonthCounts, statistic: Statistic) -> Result<MonthlyTable, AppError> {
    let (Some(first_year), Some(last_year)) = (counts.first_year(), counts.last_year()) else {
        return Err(AppError::new(3, "No year-month counts to aggregate."));
    };

    let mut per_month: Vec<Vec<f64>> = vec![Vec::new(); 12];
    for (&(_, month), &count) in &counts.counts {
        per_month[(month - 1) as usize].push(statistic.apply(count));
    }

    let mut rows = Vec::with_capacity(12);
    for (idx, values) in per_month.iter().enumerate() {
        let month = idx as u32 + 1;
        let Some(m) = mean(values) else {
            return Err(AppError::new(
                3,
                format!(
                    "Calendar month {month} has no data; need at least 12 consecutive months."
                ),
            ));
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        rows.push(MonthlyStat {
            month,
            n_years: values.len(),
            mean: m,
            variance: sample_variance(values),
            min,
            max,
        });
    }

    Ok(MonthlyTable {
        statistic,
        unit: counts.unit,
        rows,
        first_year,
        last_year,
        total_count: counts.total(),
    })
}
