/// Return-period resolution.
///
/// Compares a station's mean forecast discharge against its ladder of
/// historical return-period thresholds. Two independent resolutions:
///
/// - `resolve_return_period`: the most specific bucket the discharge has
///   reached — checked descending (20 → 10 → 5 → 2) with `>=`, first match
///   wins. Monotone in the discharge by construction.
/// - `flood_extent_return_period`: which flood-extent map downstream should
///   display for a *triggered* station. Policy is country-configured: the
///   ZMB/MWI deployments pick 20 or 10 by the 20-year threshold; everyone
///   else shows a fixed 25-year extent.

use crate::config::FloodExtentPolicy;
use crate::model::ReturnThresholds;

/// Fixed flood-extent return period for countries without threshold-based
/// extent selection.
const FIXED_EXTENT_YEARS: u16 = 25;

/// The largest return period whose threshold the mean discharge has
/// reached, or `None` below the 2-year threshold.
pub fn resolve_return_period(mean_discharge: f64, thresholds: &ReturnThresholds) -> Option<u16> {
    if mean_discharge >= thresholds.twenty_year {
        Some(20)
    } else if mean_discharge >= thresholds.ten_year {
        Some(10)
    } else if mean_discharge >= thresholds.five_year {
        Some(5)
    } else if mean_discharge >= thresholds.two_year {
        Some(2)
    } else {
        None
    }
}

/// Flood-extent return period for a station, `None` when not triggered.
pub fn flood_extent_return_period(
    triggered: bool,
    mean_discharge: f64,
    thresholds: &ReturnThresholds,
    policy: FloodExtentPolicy,
) -> Option<u16> {
    if !triggered {
        return None;
    }
    match policy {
        FloodExtentPolicy::ByTwentyYearThreshold => {
            if mean_discharge >= thresholds.twenty_year {
                Some(20)
            } else {
                Some(10)
            }
        }
        FloodExtentPolicy::FixedTwentyFive => Some(FIXED_EXTENT_YEARS),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
