/// Run orchestrator: retrieval → extraction → trigger resolution → output.
///
/// A linear state machine with no back edges:
///
///   mock? ──yes──▶ extract mock ─────────────────────────┐
///     │no                                                 ▼
///   remove old inputs ▶ fetch (retry) ▶ extract ▶ summarize ▶ persist
///
/// Retrieval exhausting its deadline is fatal (a missing forecast must not
/// silently produce a stale or empty decision). Extraction and resolution
/// failures propagate uncaught — a run either fully succeeds or fully
/// fails. Per-station data gaps (unmapped station, empty ensemble group)
/// are skipped with a log line instead, to maximize partial output.
///
/// Aggregation granularity follows the extraction strategy: the report and
/// mock strategies group by station; the grid strategy groups by admin
/// placecode, with each placecode reported under its mapped station's code
/// and thresholds. Two placecodes governed by one station therefore yield
/// two output rows with the same code, as the upstream artifacts do.
///
/// The pipeline owns every derived entity for the duration of one run and
/// holds no state across runs; each invocation reads fresh configuration
/// and input and writes a fresh lead-time/country-scoped output set.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::alert::classify::{classify, is_triggered};
use crate::alert::return_period::{flood_extent_return_period, resolve_return_period};
use crate::analysis::probability::{EnsembleSizing, ExceedanceRule, group_records, summarize};
use crate::config::{CountrySettings, ExtractionStrategy, FtpCredentials, RunPaths};
use crate::fetch::ftp::Transport;
use crate::fetch::{Clock, RetryPolicy, fetch_archive, fetch_grid_members, fetch_with_retry, zonal};
use crate::ingest;
use crate::model::{
    ENSEMBLE_MEMBERS, ForecastRecord, LEAD_TIME_STEPS, LeadTime, PipelineError, ReturnThresholds,
};
use crate::output::{self, StationForecast, StationTriggerReport, TriggerPerDay};
use crate::stations::StationRegistry;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One run's configuration and collaborators, resolved once at startup.
pub struct Pipeline {
    iso3: String,
    settings: CountrySettings,
    registry: StationRegistry,
    lead_time: LeadTime,
    run_date: NaiveDate,
    paths: RunPaths,
    retry: RetryPolicy,
}

/// What a completed run produced, for operator logging.
#[derive(Debug)]
pub struct RunOutcome {
    /// Station rows written to the forecast artifact, sentinel included.
    pub stations_reported: usize,
    pub trigger_per_day: TriggerPerDay,
}

impl Pipeline {
    pub fn new(
        iso3: &str,
        settings: CountrySettings,
        registry: StationRegistry,
        lead_time: LeadTime,
        run_date: NaiveDate,
        paths: RunPaths,
    ) -> Self {
        Pipeline {
            iso3: iso3.to_string(),
            settings,
            registry,
            lead_time,
            run_date,
            paths,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry bounds (tests use short deadlines).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Executes the full run.
    pub fn run(
        &self,
        transport: &dyn Transport,
        clock: &dyn Clock,
    ) -> Result<RunOutcome, PipelineError> {
        log::info!(
            "starting {} run for lead time {} (mock={})",
            self.iso3,
            self.lead_time.label(),
            self.settings.mock
        );
        self.paths.ensure_output_dirs()?;

        let records = if self.settings.mock {
            ingest::mock::extract(&self.registry, self.settings.if_mock_trigger)
        } else {
            self.remove_old_inputs()?;
            self.download(transport, clock)?;
            self.extract()?
        };

        let (stations, trigger_per_day) = self.summarize_sites(&records);

        output::write_forecast(&self.paths.forecast_json(), &stations)?;
        output::write_trigger_per_day(&self.paths.trigger_per_day_json(), &trigger_per_day)?;

        self.resolve_triggers()?;

        Ok(RunOutcome {
            stations_reported: stations.len(),
            trigger_per_day,
        })
    }

    // -- Retrieval -----------------------------------------------------------

    /// Clears stale date-stamped artifacts from earlier runs so a partial
    /// fetch can never mix forecast cycles.
    fn remove_old_inputs(&self) -> Result<(), PipelineError> {
        for dir in [self.paths.input_glofas(), self.paths.input_glofas_grid()] {
            if dir.exists() {
                for entry in fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.is_file() {
                        fs::remove_file(path)?;
                    }
                }
            } else {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    fn download(&self, transport: &dyn Transport, clock: &dyn Clock) -> Result<(), PipelineError> {
        let credentials = FtpCredentials::from_env().map_err(PipelineError::Fetch)?;
        let date_stamp = self.run_date.format("%Y%m%d").to_string();

        match self.settings.extraction {
            ExtractionStrategy::Report => fetch_with_retry(self.retry, clock, || {
                fetch_archive(
                    transport,
                    &self.settings,
                    &credentials,
                    self.paths.input_glofas(),
                    &date_stamp,
                )
            })
            .map_err(PipelineError::Fetch),
            ExtractionStrategy::Grid => {
                let raster = self.settings.zone_raster.as_deref().ok_or_else(|| {
                    PipelineError::Configuration(format!(
                        "country {} uses grid extraction but has no zone_raster configured",
                        self.iso3
                    ))
                })?;
                let sampler =
                    zonal::configured_sampler(Path::new(raster)).map_err(PipelineError::Fetch)?;

                fetch_with_retry(self.retry, clock, || {
                    fetch_grid_members(
                        transport,
                        sampler.as_ref(),
                        &self.settings,
                        &credentials,
                        self.paths.input_glofas_grid(),
                        &date_stamp,
                    )
                })
                .map_err(PipelineError::Fetch)
            }
        }
    }

    // -- Extraction ----------------------------------------------------------

    fn extract(&self) -> Result<Vec<ForecastRecord>, PipelineError> {
        match self.settings.extraction {
            ExtractionStrategy::Report => {
                let report_name = self.settings.report_name.as_deref().ok_or_else(|| {
                    PipelineError::Configuration(format!(
                        "country {} uses report extraction but has no report_name configured",
                        self.iso3
                    ))
                })?;
                Ok(ingest::report::extract(
                    self.paths.input_glofas(),
                    report_name,
                    self.run_date,
                )?)
            }
            ExtractionStrategy::Grid => Ok(ingest::grid::extract(
                self.paths.input_glofas_grid(),
                &self.settings.placecode_prefix,
                self.settings.placecode_len,
            )?),
        }
    }

    // -- Summarization -------------------------------------------------------

    fn aggregation_policy(&self) -> (ExceedanceRule, EnsembleSizing) {
        if self.settings.mock {
            return (
                ExceedanceRule::GreaterEqual,
                EnsembleSizing::Nominal(ENSEMBLE_MEMBERS),
            );
        }
        match self.settings.extraction {
            // Historical divergence, preserved: the report strategy compares
            // strictly and divides by the members actually present.
            ExtractionStrategy::Report => {
                (ExceedanceRule::StrictlyGreater, EnsembleSizing::Actual)
            }
            ExtractionStrategy::Grid => (
                ExceedanceRule::GreaterEqual,
                EnsembleSizing::Nominal(ENSEMBLE_MEMBERS),
            ),
        }
    }

    /// Aggregates records per site, classifies each (site, lead time)
    /// group, fills the trigger-per-day map across all seven steps, and
    /// selects the run's lead time for the forecast artifact.
    fn summarize_sites(&self, records: &[ForecastRecord]) -> (Vec<StationForecast>, TriggerPerDay) {
        let groups = group_records(records);
        let (rule, sizing) = self.aggregation_policy();

        let mut stations = Vec::new();
        let mut trigger_per_day = TriggerPerDay::default();

        if !self.settings.mock && self.settings.extraction == ExtractionStrategy::Grid {
            // Grid records are keyed by admin placecode; each selected
            // placecode aggregates separately under its mapped station's
            // code and thresholds.
            for pcode in &self.settings.selected_pcodes {
                let Some(station_code) = self.registry.station_for_pcode(pcode) else {
                    log::warn!("no station mapped for selected placecode {}", pcode);
                    continue;
                };
                let Some(station) = self.registry.find(station_code) else {
                    log::warn!(
                        "placecode {} maps to unknown station {}",
                        pcode,
                        station_code
                    );
                    continue;
                };
                let (rows, triggered_steps) =
                    self.summarize_one_site(pcode, &station.code, &station.thresholds(), &groups, rule, sizing);
                stations.extend(rows);
                for step in triggered_steps {
                    trigger_per_day.set(step);
                }
            }
        } else {
            for station in self.registry.stations() {
                if !self.registry.is_mapped(&station.code) {
                    log::debug!("skipping station {} with no district mapping", station.code);
                    continue;
                }
                let (rows, triggered_steps) = self.summarize_one_site(
                    &station.code,
                    &station.code,
                    &station.thresholds(),
                    &groups,
                    rule,
                    sizing,
                );
                stations.extend(rows);
                for step in triggered_steps {
                    trigger_per_day.set(step);
                }
            }
        }

        stations.push(StationForecast::no_station_sentinel());
        (stations, trigger_per_day)
    }

    /// Aggregates one site's seven lead-time groups. `group_site` is the
    /// extraction key (placecode for grid, station code otherwise);
    /// `report_code` is the station code written to the artifact. Returns
    /// the artifact rows for the run's lead time and the steps at which
    /// this site triggered.
    fn summarize_one_site(
        &self,
        group_site: &str,
        report_code: &str,
        thresholds: &ReturnThresholds,
        groups: &BTreeMap<(String, u32), Vec<f64>>,
        rule: ExceedanceRule,
        sizing: EnsembleSizing,
    ) -> (Vec<StationForecast>, Vec<u32>) {
        let trigger_threshold = thresholds.level(self.settings.trigger_level);

        let mut rows = Vec::new();
        let mut triggered_steps = Vec::new();

        for step in 1..=LEAD_TIME_STEPS {
            let Some(discharges) = groups.get(&(group_site.to_string(), step)) else {
                continue;
            };
            let Some(summary) = summarize(discharges, trigger_threshold, rule, sizing) else {
                continue;
            };

            let triggered =
                is_triggered(summary.exceedance_probability, self.settings.trigger_minimum);
            let alert_class = classify(
                summary.exceedance_probability,
                self.settings.alert_policy,
                &self.settings.alert_bands,
            );

            if triggered {
                triggered_steps.push(step);
            }

            if step == self.lead_time.days() {
                rows.push(StationForecast {
                    code: report_code.to_string(),
                    fc: summary.mean_discharge,
                    fc_prob: summary.exceedance_probability,
                    fc_trigger: triggered as u8,
                    eap_alert_class: alert_class,
                });
            }
        }

        (rows, triggered_steps)
    }

    // -- Trigger resolution ---------------------------------------------------

    /// Merges the freshly written forecast extraction with the station
    /// thresholds and resolves return periods, producing the final
    /// triggers_rp artifact.
    fn resolve_triggers(&self) -> Result<(), PipelineError> {
        let forecasts = output::read_forecast(&self.paths.forecast_json())?;

        let mut reports = Vec::with_capacity(forecasts.len());
        for forecast in &forecasts {
            if forecast.code == crate::model::NO_STATION {
                continue; // re-added synthetically below, with zero thresholds
            }
            let Some(station) = self.registry.find(&forecast.code) else {
                log::warn!("forecast for unknown station {} skipped", forecast.code);
                continue;
            };

            let thresholds = station.thresholds();
            let triggered = forecast.fc_trigger == 1;

            let fc_rp = resolve_return_period(forecast.fc, &thresholds);
            let fc_rp_flood_extent = flood_extent_return_period(
                triggered,
                forecast.fc,
                &thresholds,
                self.settings.flood_extent,
            );

            reports.push(StationTriggerReport::new(
                &forecast.code,
                &thresholds,
                forecast,
                fc_rp_flood_extent,
                fc_rp,
            ));
        }

        reports.push(StationTriggerReport::no_station_sentinel());
        output::write_station_reports(&self.paths.triggers_rp_json(), &reports)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlertBands, AlertPolicyKind, FloodExtentPolicy};
    use crate::model::TriggerLevel;
    use crate::stations::parse_registry;

    fn grid_settings() -> CountrySettings {
        CountrySettings {
            glofas_filename: "glofas_griddata_SouthSudan".to_string(),
            ftp_server: "https://data.example.int/glofas/".to_string(),
            report_name: None,
            trigger_level: TriggerLevel::TwoYear,
            trigger_minimum: 0.6,
            alert_policy: AlertPolicyKind::Binary,
            alert_bands: AlertBands {
                no: 0.0,
                min: 0.6,
                med: 0.7,
                max: 0.8,
            },
            flood_extent: FloodExtentPolicy::FixedTwentyFive,
            extraction: ExtractionStrategy::Grid,
            selected_pcodes: vec!["SS0101".to_string(), "SS0102".to_string()],
            placecode_prefix: "SS".to_string(),
            placecode_len: 4,
            zone_raster: Some("zones_SSD.csv".to_string()),
            mock: false,
            if_mock_trigger: false,
        }
    }

    fn ssd_registry() -> StationRegistry {
        parse_registry(
            r#"
            [[station]]
            code = "G5100"
            country = "SSD"
            threshold_2year = 30000.0
            threshold_5year = 35000.0
            threshold_10year = 39000.0
            threshold_20year = 44000.0

            [[mapping]]
            station = "G5100"
            place_code = "SS0101"

            [[mapping]]
            station = "G5100"
            place_code = "SS0102"
            "#,
            "SSD",
        )
        .expect("fixture registry should parse")
    }

    fn pipeline(settings: CountrySettings, registry: StationRegistry) -> Pipeline {
        let dir = std::env::temp_dir();
        Pipeline::new(
            "SSD",
            settings,
            registry,
            LeadTime::new(5).unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            RunPaths::new(&dir, "SSD", "5-day"),
        )
    }

    fn grid_record(pcode: &str, lead: u32, member: u32, discharge: f64) -> ForecastRecord {
        ForecastRecord {
            site_code: pcode.to_string(),
            lead_time_days: lead,
            ensemble_member: member,
            discharge,
        }
    }

    /// Full ensemble for one placecode at one lead time.
    fn full_ensemble(pcode: &str, lead: u32, discharge: f64) -> Vec<ForecastRecord> {
        (0..ENSEMBLE_MEMBERS)
            .map(|member| grid_record(pcode, lead, member, discharge))
            .collect()
    }

    #[test]
    fn test_grid_aggregates_each_placecode_separately() {
        // Both selected placecodes map to G5100 but aggregate on their own:
        // SS0101 floods, SS0102 stays dry. Two rows, same station code.
        let p = pipeline(grid_settings(), ssd_registry());
        let mut records = full_ensemble("SS0101", 5, 41000.0);
        records.extend(full_ensemble("SS0102", 5, 100.0));

        let (stations, per_day) = p.summarize_sites(&records);

        assert_eq!(stations.len(), 3, "two placecode rows plus the sentinel");
        assert!(stations[..2].iter().all(|s| s.code == "G5100"));

        let flooded = &stations[0];
        assert_eq!(flooded.fc_prob, 1.0, "all 51 members exceed 30000");
        assert_eq!(flooded.fc_trigger, 1);

        let dry = &stations[1];
        assert_eq!(dry.fc_prob, 0.0);
        assert_eq!(dry.fc_trigger, 0);

        assert!(per_day.get(5));
    }

    #[test]
    fn test_grid_probability_never_exceeds_one_across_placecodes() {
        // One station governing two flooded placecodes must not double the
        // exceed count into a probability above 1.
        let p = pipeline(grid_settings(), ssd_registry());
        let mut records = full_ensemble("SS0101", 5, 41000.0);
        records.extend(full_ensemble("SS0102", 5, 41000.0));

        let (stations, _) = p.summarize_sites(&records);
        for station in stations.iter().filter(|s| s.code != "no_station") {
            assert_eq!(station.fc_prob, 1.0);
        }
    }

    #[test]
    fn test_grid_skips_unmapped_selected_placecode() {
        let mut settings = grid_settings();
        settings
            .selected_pcodes
            .push("SS0999".to_string()); // nothing maps here
        let p = pipeline(settings, ssd_registry());

        let records = full_ensemble("SS0101", 5, 41000.0);
        let (stations, _) = p.summarize_sites(&records);
        // SS0101 row + sentinel; SS0102 has no records; SS0999 is unmapped.
        assert_eq!(stations.len(), 2);
    }

    #[test]
    fn test_grid_ignores_unselected_placecodes() {
        let p = pipeline(grid_settings(), ssd_registry());
        // Records for a placecode outside the selection never surface.
        let records = full_ensemble("SS0777", 5, 41000.0);
        let (stations, per_day) = p.summarize_sites(&records);
        assert_eq!(stations.len(), 1, "sentinel only");
        assert!(!per_day.any());
    }

    #[test]
    fn test_station_keyed_summarization_selects_run_lead_time() {
        let mut settings = grid_settings();
        settings.extraction = ExtractionStrategy::Report;
        let p = pipeline(settings, ssd_registry());

        // Above threshold at leads 4 and 5; artifact carries lead 5 only,
        // the per-day map carries both. Strict comparison: 41000 > 30000.
        let mut records = full_ensemble("G5100", 4, 41000.0);
        records.extend(full_ensemble("G5100", 5, 41000.0));

        let (stations, per_day) = p.summarize_sites(&records);
        assert_eq!(stations.len(), 2, "one station row plus the sentinel");
        assert_eq!(stations[0].code, "G5100");
        assert_eq!(stations[0].fc_prob, 1.0);
        assert!(per_day.get(4));
        assert!(per_day.get(5));
        assert!(!per_day.get(3));
    }

    #[test]
    fn test_summarize_appends_sentinel_even_with_no_records() {
        let p = pipeline(grid_settings(), ssd_registry());
        let (stations, per_day) = p.summarize_sites(&[]);
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].code, "no_station");
        assert!(!per_day.any());
    }

    #[test]
    fn test_aggregation_policy_matches_strategy() {
        let p = pipeline(grid_settings(), ssd_registry());
        assert_eq!(
            p.aggregation_policy(),
            (
                ExceedanceRule::GreaterEqual,
                EnsembleSizing::Nominal(ENSEMBLE_MEMBERS)
            )
        );

        let mut settings = grid_settings();
        settings.extraction = ExtractionStrategy::Report;
        let p = pipeline(settings, ssd_registry());
        assert_eq!(
            p.aggregation_policy(),
            (ExceedanceRule::StrictlyGreater, EnsembleSizing::Actual)
        );

        let mut settings = grid_settings();
        settings.mock = true;
        let p = pipeline(settings, ssd_registry());
        assert_eq!(
            p.aggregation_policy(),
            (
                ExceedanceRule::GreaterEqual,
                EnsembleSizing::Nominal(ENSEMBLE_MEMBERS)
            )
        );
    }
}
