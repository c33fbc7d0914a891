/// Mock extraction strategy: synthesized discharges for demo and test runs.
///
/// Produces the full (station × lead time × ensemble member) record set
/// without any input files, so the classifier and trigger resolution can be
/// exercised end to end. When `if_mock_trigger` is set, a fixed table of
/// dummy flood stations gets a deterministic discharge above its configured
/// trigger threshold at lead times 3 and beyond; everything else stays at
/// zero. With the flag off, every discharge is zero and no station triggers.

use crate::model::{ENSEMBLE_MEMBERS, ForecastRecord, LEAD_TIME_STEPS};
use crate::stations::StationRegistry;

/// Deterministic discharge for a dummy flood station. Lead times 1 and 2
/// stay at zero so the per-day trigger map shows a ramp-up.
pub fn dummy_discharge(station_code: &str, lead_time_days: u32, if_mock_trigger: bool) -> f64 {
    if !if_mock_trigger || lead_time_days < 3 {
        return 0.0;
    }

    match station_code {
        "G5220" => 600.0,    // UGA dummy flood station
        "G1067" => 5000.0,   // ETH dummy flood station 1
        "G1904" => 5500.0,   // ETH dummy flood station 2
        "G5305" => 3000.0,   // KEN dummy flood station 1
        "G5195" => 500.0,    // KEN dummy flood station 2
        "G1361" => 8000.0,   // ZMB dummy flood station 1
        "G1328" => 9000.0,   // ZMB dummy flood station 2
        "G1319" => 1400.0,   // ZMB dummy flood station 3
        "G5369" => 7000.0,   // PHL dummy flood station 1
        "G4630" => 19000.0,  // PHL dummy flood station 2
        "G196700" => 11400.0, // PHL dummy flood station 3
        "G5100" => 41400.0,  // SSD dummy flood station
        "G1724" => 10000.0,  // MWI dummy flood station 1
        "G2001" => 11000.0,  // MWI dummy flood station 2
        "G5670" => 5000.0,   // MWI dummy flood station 3
        "G5694" => 46000.0,  // MWI dummy flood station 4
        _ => 0.0,
    }
}

/// Synthesizes the full forecast record set for every mapped station in the
/// registry. Unmapped stations are skipped, matching the live strategies.
pub fn extract(registry: &StationRegistry, if_mock_trigger: bool) -> Vec<ForecastRecord> {
    log::info!("extracting mock forecast data (if_mock_trigger={})", if_mock_trigger);

    let mut records = Vec::new();

    for station in registry.stations() {
        if !registry.is_mapped(&station.code) {
            log::debug!("mock: skipping unmapped station {}", station.code);
            continue;
        }

        for step in 1..=LEAD_TIME_STEPS {
            let discharge = dummy_discharge(&station.code, step, if_mock_trigger);
            for member in 0..ENSEMBLE_MEMBERS {
                records.push(ForecastRecord {
                    site_code: station.code.clone(),
                    lead_time_days: step,
                    ensemble_member: member,
                    discharge,
                });
            }
        }
    }

    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
