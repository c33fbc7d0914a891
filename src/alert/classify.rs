/// Alert classification and the trigger flag.
///
/// Two independently configured policies, deliberately asymmetric:
///
/// - The alert class comes from the country's classification policy
///   (banded cut points for ZMB deployments, a binary max cut point
///   everywhere else).
/// - The trigger flag is a separate strict comparison against the
///   configured minimum trigger probability.
///
/// A station can therefore classify above `no` without triggering, and
/// the two cut-point sets are maintained independently.

use crate::config::{AlertBands, AlertPolicyKind};
use crate::model::AlertClass;

/// Maps a probability to an alert class under the country's policy.
///
/// Banded boundaries, exactly as configured:
///   `p <= no` → no; `p < min` → min; `p < med` → med; `p >= max` → max.
/// A probability in `[med, max)` classifies as `med` — `max` requires
/// reaching the max cut point.
///
/// Binary: `p >= max` → max, else no. No intermediate classes exist.
pub fn classify(probability: f64, policy: AlertPolicyKind, bands: &AlertBands) -> AlertClass {
    match policy {
        AlertPolicyKind::Banded => {
            if probability <= bands.no {
                AlertClass::No
            } else if probability < bands.min {
                AlertClass::Min
            } else if probability < bands.med {
                AlertClass::Med
            } else if probability >= bands.max {
                AlertClass::Max
            } else {
                AlertClass::Med
            }
        }
        AlertPolicyKind::Binary => {
            if probability >= bands.max {
                AlertClass::Max
            } else {
                AlertClass::No
            }
        }
    }
}

/// The trigger flag: strictly greater than the configured minimum.
/// A probability exactly at the minimum does not trigger.
pub fn is_triggered(probability: f64, trigger_minimum: f64) -> bool {
    probability > trigger_minimum
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
