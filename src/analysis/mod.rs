/// Ensemble analysis.
///
/// `probability` turns the flat forecast record stream into per-site,
/// per-lead-time exceedance statistics. Alerting policy lives in `alert`;
/// this layer only counts and averages.

pub mod probability;
