/// Grid extraction strategy: per-ensemble-member zonal CSVs.
///
/// The retrieval controller leaves one `glofas_<ens>.csv` per ensemble
/// member in the grid input directory, each carrying per-zone maximum
/// discharge at each lead-time step. This strategy reads all members and
/// reconstructs admin placecodes from the raw numeric zone ids using the
/// country's prefix and zero-padded digit width — a configuration contract,
/// not a constant (South Sudan uses `SS` + 4 digits; other deployments
/// differ).
///
/// A missing or truncated member file is structural (the ensemble would be
/// silently undersized) and fails the extraction; individual malformed rows
/// are logged and skipped.

use std::fs;
use std::path::Path;

use crate::model::{ENSEMBLE_MEMBERS, ForecastRecord, IngestError};

// ---------------------------------------------------------------------------
// Placecode reconstruction
// ---------------------------------------------------------------------------

/// Reconstructs an admin placecode from a raw numeric zone id, e.g.
/// zone 101 with prefix `SS` and width 4 → `SS0101`.
pub fn format_placecode(prefix: &str, zone: i64, width: usize) -> String {
    format!("{}{:0width$}", prefix, zone, width = width)
}

/// Parses an underscored lead label (`3_day`) to its day count.
fn parse_lead_label(label: &str) -> Option<u32> {
    label.strip_suffix("_day")?.parse().ok()
}

// ---------------------------------------------------------------------------
// Member CSV parsing
// ---------------------------------------------------------------------------

/// Parses one member CSV into forecast records keyed by placecode.
pub fn parse_member_csv(
    text: &str,
    prefix: &str,
    width: usize,
) -> Result<Vec<ForecastRecord>, IngestError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| IngestError::Parse("empty member csv".to_string()))?;

    let cols: Vec<&str> = header.split(',').map(str::trim).collect();
    let find = |name: &str| -> Result<usize, IngestError> {
        cols.iter()
            .position(|c| *c == name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    };
    let pcode_idx = find("pcode")?;
    let ensemble_idx = find("ensemble")?;
    let lead_idx = find("leadTime")?;
    let dis_idx = find("dis")?;

    let mut records = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let needed = pcode_idx.max(ensemble_idx).max(lead_idx).max(dis_idx);
        if fields.len() <= needed {
            log::warn!("member csv: short row skipped: '{}'", line.trim());
            continue;
        }

        let Ok(zone) = fields[pcode_idx].parse::<i64>() else {
            log::warn!("member csv: bad zone id '{}'", fields[pcode_idx]);
            continue;
        };
        let Ok(member) = fields[ensemble_idx].parse::<u32>() else {
            log::warn!("member csv: bad ensemble '{}'", fields[ensemble_idx]);
            continue;
        };
        let Some(lead_time_days) = parse_lead_label(fields[lead_idx]) else {
            log::warn!("member csv: bad lead label '{}'", fields[lead_idx]);
            continue;
        };
        let Ok(discharge) = fields[dis_idx].parse::<f64>() else {
            log::warn!("member csv: bad discharge '{}'", fields[dis_idx]);
            continue;
        };

        records.push(ForecastRecord {
            site_code: format_placecode(prefix, zone, width),
            lead_time_days,
            ensemble_member: member,
            discharge,
        });
    }

    Ok(records)
}

/// Extracts forecast records from the full member CSV set in `grid_dir`.
pub fn extract(
    grid_dir: &Path,
    prefix: &str,
    width: usize,
) -> Result<Vec<ForecastRecord>, IngestError> {
    let mut records = Vec::new();

    for member in 0..ENSEMBLE_MEMBERS {
        let path = grid_dir.join(format!("glofas_{}.csv", member));
        let text = fs::read_to_string(&path)?;
        records.extend(parse_member_csv(&text, prefix, width)?);
    }

    log::info!(
        "extracted {} grid records across {} ensemble members",
        records.len(),
        ENSEMBLE_MEMBERS
    );
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
