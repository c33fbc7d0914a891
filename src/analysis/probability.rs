/// Ensemble probability aggregation.
///
/// `group_records` organizes the flat record stream into per (site, lead
/// time) groups in one pass — an explicit in-memory index instead of
/// dataframe merge/alignment semantics, so there is no silent index
/// misalignment to debug.
///
/// `summarize` computes the exceedance statistics for one group. Two
/// upstream behaviors are preserved exactly, divergences included:
///
/// - The exceedance operator differs by strategy: the grid and mock
///   strategies count `discharge >= threshold`, the station-report strategy
///   counts `discharge > threshold`. The divergence is historical and must
///   not be unified without product confirmation.
/// - The probability is `exceed_count / ensemble_size` with integer
///   truncation, so 25 of 51 members exceeding yields probability 0, not
///   0.49. Downstream consumers depend on this collapse.
///
/// Ensemble size is the nominal 51 for grid and mock groups; the
/// station-report strategy uses the count of records actually present
/// (members can be missing from a report), which can under-count the
/// probability — also preserved as observed.

use std::collections::BTreeMap;

use crate::model::{EnsembleSummary, ForecastRecord};

// ---------------------------------------------------------------------------
// Policy knobs
// ---------------------------------------------------------------------------

/// Which comparison counts a member as exceeding the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceedanceRule {
    /// Grid and mock strategies.
    GreaterEqual,
    /// Station-report strategy.
    StrictlyGreater,
}

impl ExceedanceRule {
    fn exceeds(&self, discharge: f64, threshold: f64) -> bool {
        match self {
            ExceedanceRule::GreaterEqual => discharge >= threshold,
            ExceedanceRule::StrictlyGreater => discharge > threshold,
        }
    }
}

/// How the ensemble denominator is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleSizing {
    /// Fixed nominal size (51 for GloFAS).
    Nominal(u32),
    /// Count of records actually present in the group.
    Actual,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Groups records by (site code, lead time) in one pass. BTreeMap keeps
/// iteration deterministic, so output files are stable across runs.
pub fn group_records(records: &[ForecastRecord]) -> BTreeMap<(String, u32), Vec<f64>> {
    let mut groups: BTreeMap<(String, u32), Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.site_code.clone(), record.lead_time_days))
            .or_default()
            .push(record.discharge);
    }
    groups
}

// ---------------------------------------------------------------------------
// Summarization
// ---------------------------------------------------------------------------

/// Computes the ensemble summary for one (site, lead time) group.
///
/// Returns `None` for an empty group, or when sizing is `Actual` and no
/// records are present — there is nothing to decide on, and the caller
/// skips the group rather than emitting a fake zero forecast.
pub fn summarize(
    discharges: &[f64],
    threshold: f64,
    rule: ExceedanceRule,
    sizing: EnsembleSizing,
) -> Option<EnsembleSummary> {
    if discharges.is_empty() {
        return None;
    }

    let ensemble_size = match sizing {
        EnsembleSizing::Nominal(n) => n,
        EnsembleSizing::Actual => discharges.len() as u32,
    };
    if ensemble_size == 0 {
        return None;
    }

    let exceed_count = discharges
        .iter()
        .filter(|&&d| rule.exceeds(d, threshold))
        .count() as u32;
    let sum: f64 = discharges.iter().sum();

    // Integer division first: anything short of full-ensemble exceedance
    // truncates to zero.
    let exceedance_probability = (exceed_count / ensemble_size) as f64;
    let mean_discharge = sum / ensemble_size as f64;

    Some(EnsembleSummary {
        mean_discharge,
        exceedance_probability,
        exceed_count,
        ensemble_size,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
