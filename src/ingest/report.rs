/// Station text-report extraction strategy.
///
/// Parses the two whitespace-delimited reports delivered in the forecast
/// archive:
///   - `glofas_discharge_<name>_<YYYYMMDD>00.txt` — one row per
///     (station, forecast time, ensemble member) with a `dis` value
///   - `glofas_returnlevels_ldd_ups_<name>_<YYYYMMDD>00.txt` — station
///     metadata and return levels, joined on station code
///
/// Report format: first non-empty line is a column-name header; all values
/// are single whitespace-delimited tokens. The `name` column packs the
/// station code and station name as `G1361_Chavuma`. Lead time is the whole
/// -day difference between the row's forecast time and the run date; rows
/// outside lead times 1..=7 are dropped.
///
/// Rows that fail to parse and stations missing from the return-level
/// report are skipped per-entity (logged), not fatal — partial output
/// availability beats an aborted run. A missing file or a header without
/// the required columns is structural and fails the extraction.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::model::{ForecastRecord, IngestError, LEAD_TIME_STEPS, NO_STATION};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One parsed row of the discharge report.
#[derive(Debug, Clone, PartialEq)]
pub struct DischargeRow {
    pub station_code: String,
    pub station_name: String,
    pub forecast_date: NaiveDate,
    pub member: u32,
    pub discharge: f64,
}

/// Station metadata from the return-level report. Individual levels may be
/// absent for stations without a fitted climatology.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnLevelRow {
    pub station_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub level_2year: Option<f64>,
    pub level_5year: Option<f64>,
    pub level_20year: Option<f64>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Builds a column-name → index map from a report header line.
fn column_map(header: &str) -> HashMap<String, usize> {
    header
        .split_whitespace()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}

fn require_column(map: &HashMap<String, usize>, name: &str) -> Result<usize, IngestError> {
    map.get(name)
        .copied()
        .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
}

/// Splits a packed `code_Name` token into station code and name. A token
/// without an underscore is all code.
fn split_station_name(token: &str) -> (String, String) {
    match token.split_once('_') {
        Some((code, name)) => (code.to_string(), name.to_string()),
        None => (token.to_string(), String::new()),
    }
}

/// Parses a forecast time token to its calendar date. Reports have used a
/// few timestamp spellings over the years; all are single tokens.
fn parse_time_token(token: &str) -> Option<NaiveDate> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(token, "%Y%m%d%H%M") {
        return Some(dt.date());
    }
    None
}

/// Parses the discharge report into rows. Malformed rows are logged and
/// skipped.
pub fn parse_discharge_report(text: &str) -> Result<Vec<DischargeRow>, IngestError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| IngestError::Parse("empty discharge report".to_string()))?;

    let cols = column_map(header);
    let name_idx = require_column(&cols, "name")?;
    let time_idx = require_column(&cols, "time")?;
    let dis_idx = require_column(&cols, "dis")?;
    let member_idx = require_column(&cols, "member")?;

    let mut rows = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let needed = name_idx.max(time_idx).max(dis_idx).max(member_idx);
        if fields.len() <= needed {
            log::warn!("discharge report: short row skipped: '{}'", line.trim());
            continue;
        }

        let (station_code, station_name) = split_station_name(fields[name_idx]);

        let Some(forecast_date) = parse_time_token(fields[time_idx]) else {
            log::warn!(
                "discharge report: unparseable time '{}' for {}",
                fields[time_idx],
                station_code
            );
            continue;
        };

        let Ok(member) = fields[member_idx].parse::<u32>() else {
            log::warn!(
                "discharge report: bad member '{}' for {}",
                fields[member_idx],
                station_code
            );
            continue;
        };

        let Ok(discharge) = fields[dis_idx].parse::<f64>() else {
            log::warn!(
                "discharge report: bad discharge '{}' for {}",
                fields[dis_idx],
                station_code
            );
            continue;
        };

        rows.push(DischargeRow {
            station_code,
            station_name,
            forecast_date,
            member,
            discharge,
        });
    }

    Ok(rows)
}

/// Parses the return-level report into a map keyed by station code.
/// Missing or non-numeric level fields become `None`.
pub fn parse_return_levels(text: &str) -> Result<HashMap<String, ReturnLevelRow>, IngestError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| IngestError::Parse("empty return-level report".to_string()))?;

    let cols = column_map(header);
    let name_idx = require_column(&cols, "Name")?;
    let lat_idx = cols.get("lat").copied();
    let lon_idx = cols.get("lon").copied();
    let rl2_idx = cols.get("2y").copied();
    let rl5_idx = cols.get("5y").copied();
    let rl20_idx = cols.get("20y").copied();

    let get_f64 = |fields: &[&str], idx: Option<usize>| -> Option<f64> {
        idx.and_then(|i| fields.get(i)).and_then(|v| v.parse().ok())
    };

    let mut levels = HashMap::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= name_idx {
            log::warn!("return-level report: short row skipped: '{}'", line.trim());
            continue;
        }
        let (station_code, _) = split_station_name(fields[name_idx]);

        levels.insert(
            station_code.clone(),
            ReturnLevelRow {
                station_code,
                latitude: get_f64(&fields, lat_idx),
                longitude: get_f64(&fields, lon_idx),
                level_2year: get_f64(&fields, rl2_idx),
                level_5year: get_f64(&fields, rl5_idx),
                level_20year: get_f64(&fields, rl20_idx),
            },
        );
    }

    Ok(levels)
}

// ---------------------------------------------------------------------------
// Join + record emission
// ---------------------------------------------------------------------------

/// Left-joins discharge rows against return-level metadata and yields one
/// `ForecastRecord` per (station, lead time, ensemble member).
///
/// Lead time is `forecast_date - run_date` in whole days; only 1..=7
/// survive. The `no_station` sentinel never yields records. Stations absent
/// from the return-level report are kept (logged once per row at debug).
pub fn join_records(
    rows: Vec<DischargeRow>,
    levels: &HashMap<String, ReturnLevelRow>,
    run_date: NaiveDate,
) -> Vec<ForecastRecord> {
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        if row.station_code == NO_STATION {
            continue;
        }

        if !levels.contains_key(&row.station_code) {
            log::debug!(
                "station {} missing from return-level report",
                row.station_code
            );
        }

        let lead = (row.forecast_date - run_date).num_days();
        if lead < 1 || lead > LEAD_TIME_STEPS as i64 {
            continue;
        }

        records.push(ForecastRecord {
            site_code: row.station_code,
            lead_time_days: lead as u32,
            ensemble_member: row.member,
            discharge: row.discharge,
        });
    }

    records
}

/// Extracts forecast records from the pair of text reports in `input_dir`.
pub fn extract(
    input_dir: &Path,
    report_name: &str,
    run_date: NaiveDate,
) -> Result<Vec<ForecastRecord>, IngestError> {
    let date_stamp = run_date.format("%Y%m%d").to_string();

    let discharge_path = input_dir.join(format!(
        "glofas_discharge_{}_{}00.txt",
        report_name, date_stamp
    ));
    let levels_path = input_dir.join(format!(
        "glofas_returnlevels_ldd_ups_{}_{}00.txt",
        report_name, date_stamp
    ));

    log::info!("extracting station reports from {}", discharge_path.display());

    let discharge_text = fs::read_to_string(&discharge_path)?;
    let levels_text = fs::read_to_string(&levels_path)?;

    let rows = parse_discharge_report(&discharge_text)?;
    let levels = parse_return_levels(&levels_text)?;

    Ok(join_records(rows, &levels, run_date))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    // --- Discharge report parsing -------------------------------------------

    #[test]
    fn test_parse_discharge_report_splits_packed_name() {
        let rows = parse_discharge_report(fixture_discharge_report()).expect("should parse");
        assert!(!rows.is_empty());
        assert_eq!(rows[0].station_code, "G1361");
        assert_eq!(rows[0].station_name, "Chavuma");
    }

    #[test]
    fn test_parse_discharge_report_reads_member_and_discharge() {
        let rows = parse_discharge_report(fixture_discharge_report()).expect("should parse");
        let row = rows
            .iter()
            .find(|r| r.station_code == "G1361" && r.member == 1)
            .expect("member 1 row should exist");
        assert!((row.discharge - 5950.0).abs() < 1e-9);
        assert_eq!(
            row.forecast_date,
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
        );
    }

    #[test]
    fn test_parse_discharge_report_skips_malformed_rows() {
        let text = "name time dis member\n\
                    G1361_Chavuma 2026-08-06T00:00:00 5900.0 0\n\
                    G1361_Chavuma not-a-date 5950.0 1\n\
                    G1361_Chavuma 2026-08-06T00:00:00 oops 2\n\
                    G1361_Chavuma 2026-08-06T00:00:00 6000.0\n";
        let rows = parse_discharge_report(text).expect("should parse");
        assert_eq!(rows.len(), 1, "only the fully valid row survives");
        assert_eq!(rows[0].member, 0);
    }

    #[test]
    fn test_parse_discharge_report_missing_column_is_structural() {
        let text = "name time dis\nG1361_Chavuma 2026-08-06T00:00:00 5900.0\n";
        let err = parse_discharge_report(text).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn(ref c) if c == "member"));
    }

    #[test]
    fn test_parse_time_token_accepts_known_spellings() {
        let expected = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(parse_time_token("2026-08-06T00:00:00"), Some(expected));
        assert_eq!(parse_time_token("2026-08-06"), Some(expected));
        assert_eq!(parse_time_token("202608060000"), Some(expected));
        assert_eq!(parse_time_token("sometime"), None);
    }

    // --- Return-level report parsing ----------------------------------------

    #[test]
    fn test_parse_return_levels_keyed_by_station_code() {
        let levels = parse_return_levels(fixture_return_levels_report()).expect("should parse");
        let g1361 = levels.get("G1361").expect("G1361 should be present");
        assert_eq!(g1361.level_2year, Some(4000.0));
        assert_eq!(g1361.level_20year, Some(7300.0));
        assert_eq!(g1361.latitude, Some(-13.08));
    }

    #[test]
    fn test_parse_return_levels_tolerates_missing_values() {
        let text = "Name lat lon 2y 5y 20y\nG9001_NoClim 1.0 2.0 NA NA NA\n";
        let levels = parse_return_levels(text).expect("should parse");
        let row = levels.get("G9001").expect("row should be present");
        assert_eq!(row.level_2year, None);
        assert_eq!(row.level_5year, None);
        assert_eq!(row.level_20year, None);
    }

    // --- Join ----------------------------------------------------------------

    #[test]
    fn test_join_computes_lead_time_from_run_date() {
        let rows = parse_discharge_report(fixture_discharge_report()).expect("should parse");
        let levels = parse_return_levels(fixture_return_levels_report()).expect("should parse");
        let records = join_records(rows, &levels, run_date());

        let g1361: Vec<_> = records.iter().filter(|r| r.site_code == "G1361").collect();
        assert!(!g1361.is_empty());
        assert!(g1361.iter().all(|r| r.lead_time_days == 5));
    }

    #[test]
    fn test_join_drops_rows_outside_lead_window() {
        let rows = vec![
            DischargeRow {
                station_code: "G1361".to_string(),
                station_name: "Chavuma".to_string(),
                forecast_date: run_date(), // lead 0
                member: 0,
                discharge: 100.0,
            },
            DischargeRow {
                station_code: "G1361".to_string(),
                station_name: "Chavuma".to_string(),
                forecast_date: run_date() + chrono::Duration::days(8), // lead 8
                member: 0,
                discharge: 100.0,
            },
            DischargeRow {
                station_code: "G1361".to_string(),
                station_name: "Chavuma".to_string(),
                forecast_date: run_date() + chrono::Duration::days(7), // lead 7
                member: 0,
                discharge: 100.0,
            },
        ];
        let records = join_records(rows, &HashMap::new(), run_date());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lead_time_days, 7);
    }

    #[test]
    fn test_join_filters_no_station_sentinel() {
        let rows = vec![DischargeRow {
            station_code: NO_STATION.to_string(),
            station_name: String::new(),
            forecast_date: run_date() + chrono::Duration::days(3),
            member: 0,
            discharge: 100.0,
        }];
        let records = join_records(rows, &HashMap::new(), run_date());
        assert!(records.is_empty());
    }

    #[test]
    fn test_join_keeps_stations_missing_from_return_levels() {
        // Left-join semantics: a station absent from the return-level report
        // still yields records.
        let rows = vec![DischargeRow {
            station_code: "G7777".to_string(),
            station_name: "New".to_string(),
            forecast_date: run_date() + chrono::Duration::days(2),
            member: 4,
            discharge: 321.0,
        }];
        let records = join_records(rows, &HashMap::new(), run_date());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].site_code, "G7777");
        assert_eq!(records[0].ensemble_member, 4);
    }

    // --- File-level extraction ----------------------------------------------

    #[test]
    fn test_extract_reads_report_pair_from_input_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("glofas_discharge_ZambiaRedcross_2026080100.txt"),
            fixture_discharge_report(),
        )
        .unwrap();
        std::fs::write(
            dir.path()
                .join("glofas_returnlevels_ldd_ups_ZambiaRedcross_2026080100.txt"),
            fixture_return_levels_report(),
        )
        .unwrap();

        let records =
            extract(dir.path(), "ZambiaRedcross", run_date()).expect("extraction should succeed");
        assert!(!records.is_empty());
        assert!(records.iter().any(|r| r.site_code == "G1361"));
        assert!(records.iter().any(|r| r.site_code == "G1328"));
    }

    #[test]
    fn test_extract_missing_file_is_structural_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = extract(dir.path(), "ZambiaRedcross", run_date());
        assert!(matches!(result, Err(IngestError::Io(_))));
    }
}
