//! Synthetic seasonal incident generation.
//!
//! Per year-month the number of incidents is Poisson with mean
//!
//! ```text
//! λ(m) = base · (1 + amplitude · sin(2π·m/12 + phase))
//! ```
//!
//! Each incident gets a uniform day and time within its month and a unique
//! key; a fraction of incidents carry a second victim row (same key), like
//! the NYPD export.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;
use tracing::debug;

use crate::domain::{IncidentRecord, SyntheticConfig};
use crate::error::AppError;
use crate::models::month_angle;

/// Share of incidents that produce a second victim row.
const SECOND_VICTIM_PROB: f64 = 0.15;

/// Smallest Poisson mean we sample from (the rate must stay positive).
const MIN_RATE: f64 = 1e-3;

/// Generate incidents for `config.years` whole years starting at `config.start_year`.
pub fn generate_incidents(config: &SyntheticConfig) -> Result<Vec<IncidentRecord>, AppError> {
    if config.years == 0 {
        return Err(AppError::new(2, "Synthetic years must be > 0."));
    }
    if !(config.base.is_finite() && config.base > 0.0) {
        return Err(AppError::new(2, "Synthetic base rate must be finite and > 0."));
    }
    if !(config.amplitude.is_finite() && config.amplitude >= 0.0) {
        return Err(AppError::new(2, "Synthetic amplitude must be finite and >= 0."));
    }
    if !config.phase.is_finite() {
        return Err(AppError::new(2, "Synthetic phase must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let mut out = Vec::new();
    let mut next_key = 1u64;

    for year_offset in 0..config.years {
        let year = config.start_year + year_offset as i32;
        for month in 1..=12u32 {
            let lambda = monthly_rate(config, month);
            let poisson = Poisson::new(lambda)
                .map_err(|e| AppError::new(4, format!("Incident count distribution error: {e}")))?;
            let n = poisson.sample(&mut rng) as u64;

            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| AppError::new(2, format!("Invalid synthetic year {year}.")))?;
            let days = days_in_month(first);

            for _ in 0..n {
                let day_offset = rng.gen_range(0..days);
                let secs = rng.gen_range(0..86_400u32);
                let date = first + Duration::days(day_offset as i64);
                let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
                    .unwrap_or_default();
                let key = format!("SYN{next_key:08}");
                next_key += 1;

                let record = IncidentRecord {
                    key: Some(key),
                    occurred: date.and_time(time),
                };
                if rng.gen_bool(SECOND_VICTIM_PROB) {
                    out.push(record.clone());
                }
                out.push(record);
            }
        }
    }

    debug!(
        seed = config.seed,
        years = config.years,
        rows = out.len(),
        "generated synthetic incidents"
    );
    Ok(out)
}

/// Expected incidents in `month` (floored at a small positive rate).
pub fn monthly_rate(config: &SyntheticConfig, month: u32) -> f64 {
    let swing = 1.0 + config.amplitude * (month_angle(month as f64) + config.phase).sin();
    (config.base * swing).max(MIN_RATE)
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first + Duration::days(31));
    (next - first).num_days().clamp(1, 31) as u32
}

fn sample_seed(config: &SyntheticConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.start_year.hash(&mut hasher);
    config.years.hash(&mut hasher);
    config.base.to_bits().hash(&mut hasher);
    config.amplitude.to_bits().hash(&mut hasher);
    config.phase.to_bits().hash(&mut hasher);
    hasher.finish()
}
