/// Station registry and district mapping - parses stations.toml
///
/// Defines the canonical list of GloFAS virtual stations known to the
/// pipeline, their historical return-period thresholds, and the mapping
/// from stations to administrative placecodes. This is the single source
/// of truth for station codes — every other module should reference
/// stations from here rather than hardcoding codes.
///
/// A station that has no district-mapping entry carries no trigger meaning
/// downstream and is skipped by every extraction strategy.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::model::{NO_STATION, ReturnThresholds};

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single GloFAS virtual station, loaded from stations.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    /// GloFAS station code, e.g. `G1361`.
    pub code: String,
    /// ISO3 code of the country this station belongs to.
    pub country: String,
    /// Human-readable station or river name.
    pub name: Option<String>,
    /// WGS84 coordinates of the virtual station.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // Return-period discharge thresholds, ascending by definition.
    pub threshold_2year: f64,
    pub threshold_5year: f64,
    pub threshold_10year: f64,
    pub threshold_20year: f64,
}

impl StationConfig {
    pub fn thresholds(&self) -> ReturnThresholds {
        ReturnThresholds {
            two_year: self.threshold_2year,
            five_year: self.threshold_5year,
            ten_year: self.threshold_10year,
            twenty_year: self.threshold_20year,
        }
    }
}

/// One station-to-admin-area association. A station may appear in several
/// rows when it governs more than one admin area.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictMapping {
    pub station: String,
    pub place_code: String,
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Deserialize)]
struct StationFile {
    station: Vec<StationConfig>,
    #[serde(default)]
    mapping: Vec<DistrictMapping>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Stations and district mapping for a single country, with lookup indexes
/// built once at load time.
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<StationConfig>,
    mapping: Vec<DistrictMapping>,
    by_code: HashMap<String, usize>,
    station_by_pcode: HashMap<String, String>,
}

impl StationRegistry {
    fn build(stations: Vec<StationConfig>, mapping: Vec<DistrictMapping>) -> Self {
        let by_code = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.code.clone(), i))
            .collect();
        let station_by_pcode = mapping
            .iter()
            .map(|m| (m.place_code.clone(), m.station.clone()))
            .collect();
        StationRegistry {
            stations,
            mapping,
            by_code,
            station_by_pcode,
        }
    }

    /// All stations for this country, in file order, excluding the
    /// `no_station` sentinel (which is synthesized at output time, never
    /// processed).
    pub fn stations(&self) -> impl Iterator<Item = &StationConfig> {
        self.stations.iter().filter(|s| s.code != NO_STATION)
    }

    pub fn find(&self, code: &str) -> Option<&StationConfig> {
        self.by_code.get(code).map(|&i| &self.stations[i])
    }

    /// Whether the station has at least one district-mapping entry.
    pub fn is_mapped(&self, code: &str) -> bool {
        self.mapping.iter().any(|m| m.station == code)
    }

    /// The station governing an admin placecode, if any.
    pub fn station_for_pcode(&self, place_code: &str) -> Option<&str> {
        self.station_by_pcode.get(place_code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Loads the station registry for one country from stations.toml.
///
/// # Panics
/// Panics if the file is missing, malformed, or violates the ascending
/// threshold invariant. This is intentional — the pipeline cannot produce
/// trigger decisions from a broken registry.
pub fn load_registry(iso3: &str) -> StationRegistry {
    let config_path = "stations.toml";

    let contents = fs::read_to_string(config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path, e));

    parse_registry(&contents, iso3)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", config_path, e))
}

/// Parses a registry from TOML text, filtered to one country. Split from
/// `load_registry` so tests can feed inline fixtures.
pub fn parse_registry(contents: &str, iso3: &str) -> Result<StationRegistry, String> {
    let file: StationFile = toml::from_str(contents).map_err(|e| e.to_string())?;

    let stations: Vec<StationConfig> = file
        .station
        .into_iter()
        .filter(|s| s.country == iso3)
        .collect();

    for s in &stations {
        let t = s.thresholds();
        if !(t.two_year <= t.five_year && t.five_year <= t.ten_year && t.ten_year <= t.twenty_year)
        {
            return Err(format!(
                "station {}: return-period thresholds must ascend 2y <= 5y <= 10y <= 20y",
                s.code
            ));
        }
    }

    let station_codes: Vec<&str> = stations.iter().map(|s| s.code.as_str()).collect();
    let mapping = file
        .mapping
        .into_iter()
        .filter(|m| station_codes.contains(&m.station.as_str()))
        .collect();

    Ok(StationRegistry::build(stations, mapping))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
        [[station]]
        code = "G1361"
        country = "ZMB"
        name = "Zambezi at Chavuma"
        latitude = -13.08
        longitude = 22.68
        threshold_2year = 4000.0
        threshold_5year = 5200.0
        threshold_10year = 6100.0
        threshold_20year = 7300.0

        [[station]]
        code = "G1328"
        country = "ZMB"
        threshold_2year = 5000.0
        threshold_5year = 6500.0
        threshold_10year = 7600.0
        threshold_20year = 8800.0

        [[station]]
        code = "G1067"
        country = "ETH"
        threshold_2year = 4000.0
        threshold_5year = 4500.0
        threshold_10year = 4800.0
        threshold_20year = 6000.0

        [[mapping]]
        station = "G1361"
        place_code = "ZMB13001"

        [[mapping]]
        station = "G1361"
        place_code = "ZMB13002"

        [[mapping]]
        station = "G1067"
        place_code = "ET0721"
        "#
    }

    #[test]
    fn test_registry_filters_by_country() {
        let zmb = parse_registry(sample_toml(), "ZMB").expect("should parse");
        assert_eq!(zmb.len(), 2);
        assert!(zmb.find("G1361").is_some());
        assert!(zmb.find("G1067").is_none(), "ETH station must not leak into ZMB");
    }

    #[test]
    fn test_thresholds_convert_to_model_type() {
        let zmb = parse_registry(sample_toml(), "ZMB").expect("should parse");
        let t = zmb.find("G1361").unwrap().thresholds();
        assert_eq!(t.two_year, 4000.0);
        assert_eq!(t.twenty_year, 7300.0);
    }

    #[test]
    fn test_station_may_map_to_multiple_placecodes() {
        let zmb = parse_registry(sample_toml(), "ZMB").expect("should parse");
        assert!(zmb.is_mapped("G1361"));
        assert_eq!(zmb.station_for_pcode("ZMB13001"), Some("G1361"));
        assert_eq!(zmb.station_for_pcode("ZMB13002"), Some("G1361"));
    }

    #[test]
    fn test_unmapped_station_is_detected() {
        let zmb = parse_registry(sample_toml(), "ZMB").expect("should parse");
        assert!(!zmb.is_mapped("G1328"), "G1328 has no mapping rows");
    }

    #[test]
    fn test_descending_thresholds_are_rejected() {
        let bad = r#"
        [[station]]
        code = "G9999"
        country = "ZMB"
        threshold_2year = 9000.0
        threshold_5year = 6500.0
        threshold_10year = 7600.0
        threshold_20year = 8800.0
        "#;
        let err = parse_registry(bad, "ZMB").unwrap_err();
        assert!(err.contains("ascend"), "got: {}", err);
    }

    #[test]
    fn test_no_station_sentinel_is_never_iterated() {
        let toml = r#"
        [[station]]
        code = "no_station"
        country = "ZMB"
        threshold_2year = 0.0
        threshold_5year = 0.0
        threshold_10year = 0.0
        threshold_20year = 0.0

        [[station]]
        code = "G1361"
        country = "ZMB"
        threshold_2year = 1.0
        threshold_5year = 2.0
        threshold_10year = 3.0
        threshold_20year = 4.0
        "#;
        let reg = parse_registry(toml, "ZMB").expect("should parse");
        let codes: Vec<&str> = reg.stations().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["G1361"]);
    }

    #[test]
    fn test_mapping_rows_for_other_countries_are_dropped() {
        let zmb = parse_registry(sample_toml(), "ZMB").expect("should parse");
        assert_eq!(zmb.station_for_pcode("ET0721"), None);
    }
}
