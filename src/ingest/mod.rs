/// Forecast artifact extraction.
///
/// Each strategy parses a different raw artifact into the same flat
/// `ForecastRecord` stream:
///   - `report` — whitespace-delimited station text reports from the
///     forecast archive
///   - `grid`   — per-ensemble-member zonal CSVs emitted by the retrieval
///     controller for grid countries
///   - `mock`   — synthesized discharges for demo and test runs
///
/// Strategy selection is configuration-driven (`config::ExtractionStrategy`
/// plus the mock flag); the orchestrator picks exactly one per run.

pub mod grid;
pub mod mock;
pub mod report;

#[cfg(test)]
pub mod fixtures;
