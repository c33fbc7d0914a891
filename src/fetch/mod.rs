/// Retrieval controller: bounded-deadline retry around the country's
/// acquisition strategy.
///
/// Transient failures (portal outages, half-published datasets) are retried
/// silently every `interval` until `deadline` expires; exhausting the
/// deadline is fatal for the run. The clock is injected so retry behavior
/// is unit-testable without real sleeps.

pub mod ftp;
pub mod zonal;

use std::fs;
use std::fs::File;
use std::time::{Duration, Instant};

use crate::config::{CountrySettings, FtpCredentials};
use crate::model::{ENSEMBLE_MEMBERS, FetchError};
use self::ftp::Transport;
use self::zonal::ZonalSampler;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Wall-clock retry bounds. Defaults match the operational pipeline:
/// keep trying for 12 hours, every 10 minutes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub deadline: Duration,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            deadline: Duration::from_secs(43200),
            interval: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    pub fn new(deadline_secs: u64, interval_secs: u64) -> Self {
        RetryPolicy {
            deadline: Duration::from_secs(deadline_secs),
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn deadline_hours(&self) -> f64 {
        self.deadline.as_secs_f64() / 3600.0
    }
}

/// Clock abstraction so the retry loop can be tested without blocking.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real wall clock; `sleep` blocks the whole process, which is acceptable
/// for a scheduled batch job with one invocation per forecast cycle.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs `attempt` until it succeeds or the deadline expires.
///
/// Each failure is logged and followed by one interval of sleep. Returns
/// `FetchError::DeadlineExceeded` once the wall clock passes the deadline
/// without a successful attempt.
pub fn fetch_with_retry<F>(
    policy: RetryPolicy,
    clock: &dyn Clock,
    mut attempt: F,
) -> Result<(), FetchError>
where
    F: FnMut() -> Result<(), FetchError>,
{
    let start = clock.now();

    while clock.now().duration_since(start) < policy.deadline {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) => {
                log::error!(
                    "Download data failed. Trying again in {} minutes. {}",
                    policy.interval.as_secs() / 60,
                    e
                );
                clock.sleep(policy.interval);
            }
        }
    }

    Err(FetchError::DeadlineExceeded {
        hours: policy.deadline_hours(),
    })
}

// ---------------------------------------------------------------------------
// Acquisition strategies
// ---------------------------------------------------------------------------

/// Downloads the station-report forecast archive for `run_date` into the
/// input directory and unpacks it in place. The archive contains the
/// whitespace-delimited discharge and return-level reports consumed by the
/// report extraction strategy.
pub fn fetch_archive(
    transport: &dyn Transport,
    settings: &CountrySettings,
    credentials: &FtpCredentials,
    input_dir: &std::path::Path,
    run_date: &str,
) -> Result<(), FetchError> {
    let filename = format!("{}_{}00.tar.gz", settings.glofas_filename, run_date);
    let url = ftp::archive_url(&settings.ftp_server, credentials, &settings.glofas_filename, run_date);
    let dest = input_dir.join(&filename);

    let bytes = transport.download(&url, &dest)?;
    log::info!("downloaded forecast archive {} ({} bytes)", filename, bytes);

    unpack_archive(&dest, input_dir)?;
    Ok(())
}

/// Unpacks a gzipped tar archive into `dest_dir`.
fn unpack_archive(archive: &std::path::Path, dest_dir: &std::path::Path) -> Result<(), FetchError> {
    let file = File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest_dir)?;
    Ok(())
}

/// Downloads every ensemble member's discharge grid for `run_date`, runs the
/// zonal sampler over each, and emits one `glofas_<ens>.csv` per member into
/// the grid input directory.
///
/// Each member file is streamed in chunks to the same scratch path
/// (`glofas.nc`) before sampling, so disk usage stays at one grid at a time.
pub fn fetch_grid_members(
    transport: &dyn Transport,
    sampler: &dyn ZonalSampler,
    settings: &CountrySettings,
    credentials: &FtpCredentials,
    grid_dir: &std::path::Path,
    run_date: &str,
) -> Result<(), FetchError> {
    let scratch = grid_dir.join("glofas.nc");

    for member in 0..ENSEMBLE_MEMBERS {
        log::info!("start downloading data for ensemble {}", member);
        let url = ftp::grid_member_url(&settings.ftp_server, credentials, run_date, member);
        transport.download(&url, &scratch)?;
        log::info!("finished downloading data for ensemble {}", member);

        let rows = sampler.member_maxima(&scratch)?;
        let csv_path = zonal::write_member_csv(grid_dir, member, &rows)?;
        log::info!("saved zonal csv for ensemble {}: {}", member, csv_path.display());
    }

    fs::remove_file(&scratch).ok();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Deterministic clock: `now` advances only when `sleep` is called.
    struct FakeClock {
        start: Instant,
        elapsed: RefCell<Duration>,
        sleeps: RefCell<u32>,
    }

    impl FakeClock {
        fn new() -> Self {
            FakeClock {
                start: Instant::now(),
                elapsed: RefCell::new(Duration::ZERO),
                sleeps: RefCell::new(0),
            }
        }

        fn sleep_count(&self) -> u32 {
            *self.sleeps.borrow()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + *self.elapsed.borrow()
        }

        fn sleep(&self, duration: Duration) {
            *self.elapsed.borrow_mut() += duration;
            *self.sleeps.borrow_mut() += 1;
        }
    }

    fn transient_error() -> FetchError {
        FetchError::Zonal("portal not ready".to_string())
    }

    #[test]
    fn test_retry_returns_on_first_success() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(3600, 600);
        let result = fetch_with_retry(policy, &clock, || Ok(()));
        assert!(result.is_ok());
        assert_eq!(clock.sleep_count(), 0, "no sleep needed on first success");
    }

    #[test]
    fn test_retry_sleeps_between_failed_attempts_then_succeeds() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(3600, 600);
        let mut attempts = 0;
        let result = fetch_with_retry(policy, &clock, || {
            attempts += 1;
            if attempts < 3 {
                Err(transient_error())
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(attempts, 3);
        assert_eq!(clock.sleep_count(), 2, "one sleep after each failure");
    }

    #[test]
    fn test_retry_deadline_exhaustion_is_fatal() {
        let clock = FakeClock::new();
        // 30-minute deadline, 10-minute interval: three attempts fit.
        let policy = RetryPolicy::new(1800, 600);
        let mut attempts = 0;
        let result = fetch_with_retry(policy, &clock, || {
            attempts += 1;
            Err(transient_error())
        });
        match result {
            Err(FetchError::DeadlineExceeded { hours }) => {
                assert!((hours - 0.5).abs() < 1e-9, "deadline should report 0.5h, got {}", hours);
            }
            other => panic!("expected DeadlineExceeded, got {:?}", other),
        }
        assert_eq!(attempts, 3, "attempts run until the deadline passes");
    }

    #[test]
    fn test_default_policy_matches_operational_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.deadline.as_secs(), 43200);
        assert_eq!(policy.interval.as_secs(), 600);
        assert!((policy.deadline_hours() - 12.0).abs() < 1e-9);
    }
}
