/// Core data types for the GloFAS flood-trigger pipeline.
///
/// This module defines the shared domain model imported by all other modules,
/// plus the error taxonomy. It contains no I/O and no pipeline logic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Ensemble constants
// ---------------------------------------------------------------------------

/// Nominal GloFAS ensemble size: one control member plus 50 perturbed members.
pub const ENSEMBLE_MEMBERS: u32 = 51;

/// Number of daily forecast steps in a GloFAS product.
pub const LEAD_TIME_STEPS: u32 = 7;

/// Sentinel station code always appended to output station arrays so that
/// downstream consumers find at least one record.
pub const NO_STATION: &str = "no_station";

// ---------------------------------------------------------------------------
// Lead time
// ---------------------------------------------------------------------------

/// A forecast lead time, in whole days ahead of the run date.
///
/// Valid values are 1 through [`LEAD_TIME_STEPS`]. Output files are keyed by
/// the dashed label (`"5-day"`); the per-member zonal CSVs use an underscored
/// variant (`"5_day"`) that matches the upstream extraction convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadTime(u32);

impl LeadTime {
    pub fn new(days: u32) -> Result<Self, PipelineError> {
        if (1..=LEAD_TIME_STEPS).contains(&days) {
            Ok(LeadTime(days))
        } else {
            Err(PipelineError::Configuration(format!(
                "lead time must be 1..={}, got {}",
                LEAD_TIME_STEPS, days
            )))
        }
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// Label used in output file names and the trigger-per-day map, e.g. `5-day`.
    pub fn label(&self) -> String {
        format!("{}-day", self.0)
    }
}

// ---------------------------------------------------------------------------
// Forecast records
// ---------------------------------------------------------------------------

/// One ensemble member's forecast discharge for one site and lead time.
///
/// Produced by every extraction strategy. `site_code` is a GloFAS station
/// code for the station-report and mock strategies, and an admin placecode
/// for the grid strategy (resolved to a station by the orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub site_code: String,
    pub lead_time_days: u32,
    pub ensemble_member: u32,
    pub discharge: f64,
}

/// Ensemble aggregate for one (site, lead time) group.
///
/// `exceedance_probability` keeps the upstream integer-truncation semantics:
/// `exceed_count / ensemble_size` with integer division, so any partial
/// exceedance collapses to 0 and only full-ensemble exceedance yields 1.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleSummary {
    pub mean_discharge: f64,
    pub exceedance_probability: f64,
    pub exceed_count: u32,
    pub ensemble_size: u32,
}

// ---------------------------------------------------------------------------
// Alert classes
// ---------------------------------------------------------------------------

/// Ordinal early-action alert class, in ascending order of severity.
///
/// Serialized with the lowercase labels used by the downstream early-warning
/// platform (`"no"`, `"min"`, `"med"`, `"max"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertClass {
    No,
    Min,
    Med,
    Max,
}

impl AlertClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertClass::No => "no",
            AlertClass::Min => "min",
            AlertClass::Med => "med",
            AlertClass::Max => "max",
        }
    }
}

// ---------------------------------------------------------------------------
// Return-period thresholds
// ---------------------------------------------------------------------------

/// Historical return-period discharge thresholds for a station.
///
/// Ascending by definition: a 2-year flood is exceeded more often, and at a
/// lower discharge, than a 20-year flood. `stations.toml` is validated
/// against this invariant at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnThresholds {
    pub two_year: f64,
    pub five_year: f64,
    pub ten_year: f64,
    pub twenty_year: f64,
}

/// Selector for the single return-period threshold used as a country's
/// trigger level. Part of the configuration contract; serialized with the
/// upstream column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerLevel {
    #[serde(rename = "threshold2Year")]
    TwoYear,
    #[serde(rename = "threshold5Year")]
    FiveYear,
    #[serde(rename = "threshold10Year")]
    TenYear,
    #[serde(rename = "threshold20Year")]
    TwentyYear,
}

impl ReturnThresholds {
    /// Thresholds for the synthetic `no_station` sentinel.
    pub fn zeroed() -> Self {
        ReturnThresholds {
            two_year: 0.0,
            five_year: 0.0,
            ten_year: 0.0,
            twenty_year: 0.0,
        }
    }

    /// The discharge threshold selected by a country's trigger level.
    pub fn level(&self, level: TriggerLevel) -> f64 {
        match level {
            TriggerLevel::TwoYear => self.two_year,
            TriggerLevel::FiveYear => self.five_year,
            TriggerLevel::TenYear => self.ten_year,
            TriggerLevel::TwentyYear => self.twenty_year,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from the retrieval controller and its transport.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every retry attempt failed and the wall-clock deadline expired.
    /// Fatal: a missing forecast must not silently produce a stale or
    /// empty trigger decision.
    #[error("GloFAS download failed for {hours} hours, no new dataset was found")]
    DeadlineExceeded { hours: f64 },

    /// Non-2xx response or connection failure from the data portal.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file I/O failure while writing a downloaded artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FTP credentials missing from the environment.
    #[error("missing credential: {0}")]
    MissingCredentials(String),

    /// The zonal sampler (geometry-service boundary) failed on a member grid.
    #[error("zonal sampling failed: {0}")]
    Zonal(String),

    /// The crate was built without the `grid-netcdf` feature.
    #[error("grid ingestion requires the 'grid-netcdf' feature")]
    GridFeatureDisabled,
}

/// Errors from parsing forecast artifacts into records.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A delimited report is missing a required column.
    #[error("missing column '{0}' in report header")]
    MissingColumn(String),

    /// A report or CSV could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// An input file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level pipeline error. Retrieval timeouts and configuration problems
/// are fatal; data-quality gaps are skipped per-station before ever reaching
/// this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
