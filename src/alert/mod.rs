/// Alerting policy.
///
/// `classify` maps an exceedance probability to an ordinal alert class;
/// `return_period` resolves the historical return-period bucket and the
/// flood-extent return period for triggered stations. Both are pure
/// functions over configuration — no I/O.

pub mod classify;
pub mod return_period;
