/// Test fixtures: representative forecast artifacts.
///
/// These fixtures are structurally complete but truncated to the minimum
/// needed to exercise the parsers. The report pair reflects the real
/// whitespace-delimited GloFAS station products; the member CSV reflects
/// the per-ensemble zonal extract emitted by the retrieval controller.
///
/// All fixtures assume a run date of 2026-08-01, so forecast times of
/// 2026-08-06 are 5-day lead.

/// Discharge report: two stations, three ensemble members each, one
/// forecast time (lead 5 relative to the fixture run date). The trailing
/// `G9999_Orphan` row exercises the unmapped-station skip path.
#[cfg(test)]
pub(crate) fn fixture_discharge_report() -> &'static str {
    "name time dis member\n\
     G1361_Chavuma 2026-08-06T00:00:00 5900.0 0\n\
     G1361_Chavuma 2026-08-06T00:00:00 5950.0 1\n\
     G1361_Chavuma 2026-08-06T00:00:00 6000.0 2\n\
     G1328_Lukulu 2026-08-06T00:00:00 3100.0 0\n\
     G1328_Lukulu 2026-08-06T00:00:00 3150.0 1\n\
     G1328_Lukulu 2026-08-06T00:00:00 3200.0 2\n\
     G9999_Orphan 2026-08-06T00:00:00 150.0 0\n"
}

/// Return-level report matching the discharge fixture. `G9999` is
/// deliberately absent to exercise left-join behavior.
#[cfg(test)]
pub(crate) fn fixture_return_levels_report() -> &'static str {
    "Name lat lon 2y 5y 20y\n\
     G1361_Chavuma -13.08 22.68 4000.0 5200.0 7300.0\n\
     G1328_Lukulu -14.37 23.24 5000.0 6500.0 8800.0\n"
}

/// One member's zonal CSV: two zones, lead times 1 and 3. Raw numeric zone
/// ids; placecode reconstruction happens in the grid strategy.
#[cfg(test)]
pub(crate) fn fixture_member_csv() -> &'static str {
    "pcode,ensemble,leadTime,dis\n\
     101,0,1_day,240.5\n\
     101,0,3_day,612.0\n\
     102,0,1_day,98.0\n\
     102,0,3_day,105.5\n"
}
