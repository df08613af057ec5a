//! CSV ingest and normalization.
//!
//! This module is responsible for turning the incident CSV (NYPD export or a
//! local file with the same columns) into clean `IncidentRecord`s.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no aggregation or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::IncidentRecord;
use crate::error::AppError;

const COL_DATE: &str = "occur_date";
const COL_TIME: &str = "occur_time";
const COL_KEY: &str = "incident_key";

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%m/%d/%Y %I:%M:%S %p"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed incidents + row errors + counters.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub incidents: Vec<IncidentRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load incidents from a CSV file on disk.
pub fn load_incidents_file(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    load_incidents(file)
}

/// Load incidents from any CSV reader.
pub fn load_incidents<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let Some(&date_idx) = header_map.get(COL_DATE) else {
        return Err(AppError::new(
            2,
            format!("CSV is missing required column '{}'.", COL_DATE.to_uppercase()),
        ));
    };
    let time_idx = header_map.get(COL_TIME).copied();
    let key_idx = header_map.get(COL_KEY).copied();

    let mut incidents = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (i, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, date_idx, time_idx, key_idx) {
            Ok(incident) => incidents.push(incident),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = incidents.len();
    if !row_errors.is_empty() {
        warn!(
            skipped = row_errors.len(),
            first_line = row_errors[0].line,
            first_error = %row_errors[0].message,
            "skipped unparseable incident rows"
        );
    }
    info!(rows_read, rows_used, "ingested incident CSV");

    if rows_used == 0 {
        return Err(AppError::new(
            3,
            format!("No usable incident rows (read {rows_read})."),
        ));
    }

    Ok(IngestedData {
        incidents,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_lowercase(), i))
        .collect()
}

fn parse_row(
    record: &StringRecord,
    date_idx: usize,
    time_idx: Option<usize>,
    key_idx: Option<usize>,
) -> Result<IncidentRecord, String> {
    let raw_date = record.get(date_idx).unwrap_or("").trim();
    if raw_date.is_empty() {
        return Err("missing OCCUR_DATE".to_string());
    }

    let raw_time = time_idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("");
    let occurred = parse_occurrence(raw_date, raw_time)?;

    let key = key_idx
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    Ok(IncidentRecord { key, occurred })
}

/// Combine the date and (optional) time columns.
///
/// A full timestamp in the date column takes precedence over the time column.
pub fn parse_occurrence(raw_date: &str, raw_time: &str) -> Result<NaiveDateTime, String> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw_date, fmt) {
            return Ok(dt);
        }
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw_date, fmt).ok())
        .ok_or_else(|| format!("invalid OCCUR_DATE '{raw_date}'"))?;

    if raw_time.is_empty() {
        return Ok(date.and_time(NaiveTime::default()));
    }

    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw_time, fmt).ok())
        .ok_or_else(|| format!("invalid OCCUR_TIME '{raw_time}'"))?;

    Ok(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_nypd_style_rows() {
        let csv = "INCIDENT_KEY,OCCUR_DATE,OCCUR_TIME,BORO\n\
                   228798151,05/27/2021,21:30:00,QUEENS\n\
                   137471050,06/27/2014,17:40:00,BRONX\n";
        let data = load_incidents(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 2);
        assert_eq!(data.rows_used, 2);
        let first = &data.incidents[0];
        assert_eq!(first.key.as_deref(), Some("228798151"));
        assert_eq!(first.occurred.year(), 2021);
        assert_eq!(first.occurred.month(), 5);
        assert_eq!(first.occurred.hour(), 21);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "OCCUR_DATE,OCCUR_TIME\n\
                   01/15/2020,10:00:00\n\
                   not-a-date,10:00:00\n\
                   01/16/2020,25:99\n\
                   ,\n";
        let data = load_incidents(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 1);
        assert_eq!(data.row_errors.len(), 3);
        assert_eq!(data.row_errors[0].line, 3);
        assert!(data.row_errors[0].message.contains("OCCUR_DATE"));
        assert!(data.row_errors[1].message.contains("OCCUR_TIME"));
    }

    #[test]
    fn missing_date_column_is_schema_error() {
        let csv = "INCIDENT_KEY,BORO\n1,BRONX\n";
        let err = load_incidents(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn headers_are_case_insensitive_and_time_optional() {
        let csv = "occur_date\n2022-03-04\n";
        let data = load_incidents(csv.as_bytes()).unwrap();
        assert_eq!(data.incidents[0].key, None);
        assert_eq!(data.incidents[0].occurred.hour(), 0);
    }

    #[test]
    fn parse_occurrence_accepts_full_timestamps() {
        let dt = parse_occurrence("2021-05-27T00:00:00.000", "21:30:00").unwrap();
        assert_eq!(dt.day(), 27);
        assert_eq!(dt.hour(), 0);
        let dt = parse_occurrence("05/27/2021", "21:30").unwrap();
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn all_bad_rows_is_an_error() {
        let csv = "OCCUR_DATE\nxx\n";
        let err = load_incidents(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
