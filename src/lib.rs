/// floodcast_service: GloFAS ensemble flood-trigger pipeline.
///
/// # Module structure
///
/// ```text
/// floodcast_service
/// ├── model       — shared data types (ForecastRecord, AlertClass, errors, …)
/// ├── config      — country policy table loader (countries.toml), run paths
/// ├── stations    — station registry with return-period thresholds (stations.toml)
/// ├── fetch       — retrieval controller: bounded-deadline retry
/// │   ├── ftp     — credentialed URL construction + download transport
/// │   └── zonal   — grid download, zonal sampling boundary, member CSV emission
/// ├── ingest
/// │   ├── report  — whitespace-delimited station text reports
/// │   ├── grid    — per-ensemble-member zonal CSVs
/// │   ├── mock    — synthesized discharges for demo/test runs
/// │   └── fixtures (test only) — representative artifact payloads
/// ├── analysis
/// │   └── probability — ensemble group-by + exceedance aggregation
/// ├── alert
/// │   ├── classify      — alert class policy + trigger flag
/// │   └── return_period — return-period ladder + flood-extent policy
/// ├── output      — persisted JSON artifacts (write + read back)
/// └── pipeline    — run orchestrator (cleanup, fetch, extract, resolve, persist)
/// ```

/// Public modules
pub mod alert;
pub mod analysis;
pub mod config;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod stations;
