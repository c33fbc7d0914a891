/// Country configuration loader - parses countries.toml
///
/// Separates per-country pipeline policy from code, making it easy to
/// onboard a country, adjust trigger probabilities, or repoint the FTP
/// source without recompiling the service. Each country entry is the
/// policy table resolved once at run start; no module re-tests country
/// codes inline.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{FetchError, PipelineError, TriggerLevel};

// ---------------------------------------------------------------------------
// Policy enums
// ---------------------------------------------------------------------------

/// How raw forecast artifacts for a country are acquired and parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// Whitespace-delimited station text reports from the forecast archive.
    Report,
    /// Per-ensemble-member zonal CSVs derived from spatial grids.
    Grid,
}

/// How an exceedance probability maps to an alert class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertPolicyKind {
    /// Four ordered bands against the configured cut points (ZMB).
    Banded,
    /// `max` at or above the max cut point, otherwise `no`.
    Binary,
}

/// Which flood-extent return period accompanies a triggered station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloodExtentPolicy {
    /// 20 when the mean discharge reaches the 20-year threshold, else 10
    /// (ZMB, MWI).
    ByTwentyYearThreshold,
    /// A fixed 25-year extent regardless of magnitude.
    FixedTwentyFive,
}

/// Alert-class cut points. Band boundaries are
/// `no <= p < min <= p < med <= p < max` with `max` inclusive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AlertBands {
    pub no: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Country settings
// ---------------------------------------------------------------------------

/// Per-country pipeline configuration loaded from countries.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct CountrySettings {
    /// Base name of the forecast archive on the FTP server,
    /// completed to `<glofas_filename>_<YYYYMMDD>00.tar.gz`.
    pub glofas_filename: String,

    /// FTP server and path prefix, e.g. `data.example.int/glofas/`.
    pub ftp_server: String,

    /// Report name embedded in the station text files, e.g. `ZambiaRedcross`
    /// in `glofas_discharge_ZambiaRedcross_<date>00.txt`. Required for the
    /// report strategy.
    pub report_name: Option<String>,

    /// Which return-period threshold acts as the trigger level.
    pub trigger_level: TriggerLevel,

    /// Minimum exceedance probability; the trigger flag requires a strictly
    /// greater probability. Independent of the alert-class bands.
    pub trigger_minimum: f64,

    pub alert_policy: AlertPolicyKind,
    pub alert_bands: AlertBands,
    pub flood_extent: FloodExtentPolicy,
    pub extraction: ExtractionStrategy,

    /// Admin placecodes extracted by the grid strategy.
    #[serde(default)]
    pub selected_pcodes: Vec<String>,

    /// Placecode prefix (usually the ISO3 code) and zero-padded digit width
    /// used to reconstruct placecodes from raw numeric zone ids.
    #[serde(default)]
    pub placecode_prefix: String,
    #[serde(default)]
    pub placecode_len: usize,

    /// Zone raster produced by the geometry service (admin polygons
    /// rasterized to the forecast grid). Required for the grid strategy.
    pub zone_raster: Option<String>,

    /// Skip retrieval and synthesize forecasts instead.
    #[serde(default)]
    pub mock: bool,

    /// When mocking, raise dummy flood stations above their thresholds.
    #[serde(default)]
    pub if_mock_trigger: bool,
}

/// Root structure of countries.toml.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Base directory for pipeline input and output trees.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    pub countries: HashMap<String, CountrySettings>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Settings {
    /// Looks up a country entry. A missing country is a fatal configuration
    /// error: the pipeline cannot guess trigger policy.
    pub fn country(&self, iso3: &str) -> Result<&CountrySettings, PipelineError> {
        self.countries.get(iso3).ok_or_else(|| {
            PipelineError::Configuration(format!("no configuration for country '{}'", iso3))
        })
    }
}

/// Loads pipeline settings from countries.toml.
///
/// # Panics
/// Panics if the configuration file is missing, malformed, or incomplete.
/// This is intentional — a structural configuration failure must terminate
/// the run and surface through the scheduler's exit status.
pub fn load_settings() -> Settings {
    let config_path = "countries.toml";

    let contents = fs::read_to_string(config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path, e));

    parse_settings(&contents)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", config_path, e))
}

/// Parses settings from a TOML string. Split from `load_settings` so tests
/// can exercise the schema without touching the filesystem.
pub fn parse_settings(contents: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(contents)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// FTP credentials for the GloFAS dissemination server, read from the
/// `GLOFAS_USER` / `GLOFAS_PW` environment variables (a `.env` file is
/// honored via dotenv in `main`).
#[derive(Debug, Clone)]
pub struct FtpCredentials {
    pub user: String,
    pub password: String,
}

impl FtpCredentials {
    pub fn from_env() -> Result<Self, FetchError> {
        let user = env::var("GLOFAS_USER")
            .map_err(|_| FetchError::MissingCredentials("GLOFAS_USER".to_string()))?;
        let password = env::var("GLOFAS_PW")
            .map_err(|_| FetchError::MissingCredentials("GLOFAS_PW".to_string()))?;
        Ok(FtpCredentials { user, password })
    }
}

// ---------------------------------------------------------------------------
// Run paths
// ---------------------------------------------------------------------------

/// Input and output locations for one run, scoped by country and lead-time
/// label. Output paths are timestamp/lead-time-scoped, which is the only
/// reason earlier runs' files survive a failed run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    input_glofas: PathBuf,
    input_glofas_grid: PathBuf,
    extraction_dir: PathBuf,
    triggers_dir: PathBuf,
    iso3: String,
    lead_time_label: String,
}

impl RunPaths {
    pub fn new(data_dir: &Path, iso3: &str, lead_time_label: &str) -> Self {
        RunPaths {
            input_glofas: data_dir.join("input").join("glofas"),
            input_glofas_grid: data_dir.join("input").join("glofasgrid"),
            extraction_dir: data_dir.join("output").join("glofas_extraction"),
            triggers_dir: data_dir.join("output").join("triggers_rp_per_station"),
            iso3: iso3.to_string(),
            lead_time_label: lead_time_label.to_string(),
        }
    }

    /// Creates the output directories. Input directories are created by the
    /// stale-input cleanup step instead.
    pub fn ensure_output_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.extraction_dir)?;
        fs::create_dir_all(&self.triggers_dir)?;
        Ok(())
    }

    pub fn input_glofas(&self) -> &Path {
        &self.input_glofas
    }

    pub fn input_glofas_grid(&self) -> &Path {
        &self.input_glofas_grid
    }

    /// `glofas_forecast_<label>_<ISO3>.json`
    pub fn forecast_json(&self) -> PathBuf {
        self.extraction_dir.join(format!(
            "glofas_forecast_{}_{}.json",
            self.lead_time_label, self.iso3
        ))
    }

    /// `trigger_per_day_<ISO3>.json`
    pub fn trigger_per_day_json(&self) -> PathBuf {
        self.triggers_dir
            .join(format!("trigger_per_day_{}.json", self.iso3))
    }

    /// `triggers_rp_<label>_<ISO3>.json`
    pub fn triggers_rp_json(&self) -> PathBuf {
        self.triggers_dir.join(format!(
            "triggers_rp_{}_{}.json",
            self.lead_time_label, self.iso3
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
