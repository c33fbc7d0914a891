/// Persisted run artifacts.
///
/// Three flat JSON files per run, consumed by the downstream early-warning
/// platform. Field names match the upstream artifacts byte for byte
/// (`fc`, `fc_prob`, `fc_trigger`, `eapAlertClass`, ...), so the platform
/// cannot tell the producers apart. Readers exist for every writer: the
/// trigger-resolution step re-reads the forecast extraction it just wrote,
/// and tests round-trip each artifact.
///
/// No database, no transactions — output paths are lead-time and country
/// scoped, which is what keeps earlier runs' files intact when a run fails.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::model::{AlertClass, NO_STATION, PipelineError, ReturnThresholds};

// ---------------------------------------------------------------------------
// glofas_forecast_<label>_<ISO3>.json
// ---------------------------------------------------------------------------

/// One station's forecast summary at the run's lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationForecast {
    pub code: String,
    /// Mean ensemble discharge.
    pub fc: f64,
    /// Exceedance probability (integer-truncated, so 0 or 1).
    pub fc_prob: f64,
    /// 1 when the trigger probability policy fired, else 0.
    pub fc_trigger: u8,
    #[serde(rename = "eapAlertClass")]
    pub eap_alert_class: AlertClass,
}

impl StationForecast {
    /// The `no_station` sentinel appended to every forecast array so
    /// downstream consumers always find at least one record.
    pub fn no_station_sentinel() -> Self {
        StationForecast {
            code: NO_STATION.to_string(),
            fc: 0.0,
            fc_prob: 0.0,
            fc_trigger: 0,
            eap_alert_class: AlertClass::No,
        }
    }
}

pub fn write_forecast(path: &Path, stations: &[StationForecast]) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), stations)?;
    log::info!("Extracted Glofas data - File saved");
    Ok(())
}

pub fn read_forecast(path: &Path) -> Result<Vec<StationForecast>, PipelineError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

// ---------------------------------------------------------------------------
// trigger_per_day_<ISO3>.json
// ---------------------------------------------------------------------------

/// Whether any station triggered at each lead time. Serialized as a
/// single-element array of a 7-key map, matching the upstream artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPerDay {
    #[serde(rename = "1-day")]
    pub day1: bool,
    #[serde(rename = "2-day")]
    pub day2: bool,
    #[serde(rename = "3-day")]
    pub day3: bool,
    #[serde(rename = "4-day")]
    pub day4: bool,
    #[serde(rename = "5-day")]
    pub day5: bool,
    #[serde(rename = "6-day")]
    pub day6: bool,
    #[serde(rename = "7-day")]
    pub day7: bool,
}

impl TriggerPerDay {
    /// Marks a lead-time step as triggered. Steps outside 1..=7 cannot be
    /// constructed by the pipeline (`LeadTime` enforces the range).
    pub fn set(&mut self, lead_time_days: u32) {
        match lead_time_days {
            1 => self.day1 = true,
            2 => self.day2 = true,
            3 => self.day3 = true,
            4 => self.day4 = true,
            5 => self.day5 = true,
            6 => self.day6 = true,
            7 => self.day7 = true,
            _ => {}
        }
    }

    pub fn get(&self, lead_time_days: u32) -> bool {
        match lead_time_days {
            1 => self.day1,
            2 => self.day2,
            3 => self.day3,
            4 => self.day4,
            5 => self.day5,
            6 => self.day6,
            7 => self.day7,
            _ => false,
        }
    }

    pub fn any(&self) -> bool {
        (1..=7).any(|d| self.get(d))
    }
}

pub fn write_trigger_per_day(path: &Path, trigger: &TriggerPerDay) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &[trigger])?;
    log::info!("Extracted Glofas data - Trigger per day File saved");
    Ok(())
}

pub fn read_trigger_per_day(path: &Path) -> Result<TriggerPerDay, PipelineError> {
    let file = File::open(path)?;
    let wrapped: Vec<TriggerPerDay> = serde_json::from_reader(BufReader::new(file))?;
    wrapped
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Configuration("empty trigger_per_day file".to_string()))
}

// ---------------------------------------------------------------------------
// triggers_rp_<label>_<ISO3>.json
// ---------------------------------------------------------------------------

/// Per-station merge of thresholds, forecast summary, and resolved return
/// periods — the final trigger artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationTriggerReport {
    #[serde(rename = "stationCode")]
    pub station_code: String,
    #[serde(rename = "threshold2Year")]
    pub threshold_2year: f64,
    #[serde(rename = "threshold5Year")]
    pub threshold_5year: f64,
    #[serde(rename = "threshold10Year")]
    pub threshold_10year: f64,
    #[serde(rename = "threshold20Year")]
    pub threshold_20year: f64,
    pub fc: f64,
    pub fc_prob: f64,
    pub fc_trigger: u8,
    #[serde(rename = "eapAlertClass")]
    pub eap_alert_class: AlertClass,
    /// Flood-extent return period; null when the station did not trigger.
    pub fc_rp_flood_extent: Option<u16>,
    /// Return-period bucket; null below the 2-year threshold.
    pub fc_rp: Option<u16>,
}

impl StationTriggerReport {
    pub fn new(
        station_code: &str,
        thresholds: &ReturnThresholds,
        forecast: &StationForecast,
        fc_rp_flood_extent: Option<u16>,
        fc_rp: Option<u16>,
    ) -> Self {
        StationTriggerReport {
            station_code: station_code.to_string(),
            threshold_2year: thresholds.two_year,
            threshold_5year: thresholds.five_year,
            threshold_10year: thresholds.ten_year,
            threshold_20year: thresholds.twenty_year,
            fc: forecast.fc,
            fc_prob: forecast.fc_prob,
            fc_trigger: forecast.fc_trigger,
            eap_alert_class: forecast.eap_alert_class,
            fc_rp_flood_extent,
            fc_rp,
        }
    }

    /// Synthetic `no_station` row: zero thresholds, zero forecast, no
    /// return periods.
    pub fn no_station_sentinel() -> Self {
        StationTriggerReport::new(
            NO_STATION,
            &ReturnThresholds::zeroed(),
            &StationForecast::no_station_sentinel(),
            None,
            None,
        )
    }
}

pub fn write_station_reports(
    path: &Path,
    reports: &[StationTriggerReport],
) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), reports)?;
    log::info!("Processed Glofas data - File saved");
    Ok(())
}

pub fn read_station_reports(path: &Path) -> Result<Vec<StationTriggerReport>, PipelineError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
