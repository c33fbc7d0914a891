/// GloFAS dissemination server client: URL construction + download transport.
///
/// The dissemination server exposes date-stamped products under a
/// credentialed URL. Two products are used here:
///   - the station-report archive `<name>_<YYYYMMDD>00.tar.gz`
///   - per-ensemble-member discharge grids
///     `fc_netcdf/<YYYYMMDD>/dis_<NN>_<YYYYMMDD>00.nc`
///
/// Credentials are interpolated into the URL userinfo section and
/// percent-encoded, so passwords containing reserved characters survive.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::config::FtpCredentials;
use crate::model::FetchError;

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Splits a configured server string into scheme and host/path. A server
/// configured without a scheme defaults to `ftp://` (the historical
/// dissemination endpoint); mirrors may be configured with `https://`.
fn split_scheme(server: &str) -> (&str, &str) {
    match server.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("ftp", server),
    }
}

fn credentialed_base(server: &str, credentials: &FtpCredentials) -> String {
    let (scheme, host_path) = split_scheme(server);
    format!(
        "{}://{}:{}@{}",
        scheme,
        urlencoding::encode(&credentials.user),
        urlencoding::encode(&credentials.password),
        host_path
    )
}

/// URL of the station-report forecast archive for a run date.
pub fn archive_url(
    server: &str,
    credentials: &FtpCredentials,
    glofas_filename: &str,
    run_date: &str,
) -> String {
    format!(
        "{}{}_{}00.tar.gz",
        credentialed_base(server, credentials),
        glofas_filename,
        run_date
    )
}

/// URL of one ensemble member's discharge grid for a run date. Members are
/// numbered 00 through 50.
pub fn grid_member_url(
    server: &str,
    credentials: &FtpCredentials,
    run_date: &str,
    member: u32,
) -> String {
    format!(
        "{}fc_netcdf/{}/dis_{:02}_{}00.nc",
        credentialed_base(server, credentials),
        run_date,
        member,
        run_date
    )
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Download transport, injected so retrieval logic is testable without a
/// network. Implementations stream the body to `dest` and return the byte
/// count.
pub trait Transport {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Blocking HTTP(S) transport over the data-portal gateway.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut out = File::create(dest)?;
        // Streams chunk by chunk; the full body is never held in memory.
        let bytes = io::copy(&mut response, &mut out)?;
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> FtpCredentials {
        FtpCredentials {
            user: "rk_user".to_string(),
            password: "p@ss:word".to_string(),
        }
    }

    #[test]
    fn test_archive_url_shape() {
        let url = archive_url(
            "data.example.int/glofas/",
            &creds(),
            "glofas_pointdata_ZambiaRedcross",
            "20260805",
        );
        assert!(url.starts_with("ftp://"), "schemeless server defaults to ftp, got {}", url);
        assert!(url.ends_with("glofas_pointdata_ZambiaRedcross_2026080500.tar.gz"));
        assert!(url.contains("@data.example.int/glofas/"));
    }

    #[test]
    fn test_credentials_are_percent_encoded() {
        let url = archive_url("data.example.int/", &creds(), "x", "20260805");
        assert!(
            url.contains("rk_user:p%40ss%3Aword@"),
            "reserved characters must be encoded, got {}",
            url
        );
    }

    #[test]
    fn test_explicit_scheme_is_preserved() {
        let url = archive_url("https://mirror.example.org/glofas/", &creds(), "x", "20260805");
        assert!(url.starts_with("https://"), "got {}", url);
        assert!(!url.contains("https://https://"));
    }

    #[test]
    fn test_grid_member_url_zero_pads_member() {
        let url = grid_member_url("data.example.int/", &creds(), "20260805", 7);
        assert!(
            url.ends_with("fc_netcdf/20260805/dis_07_2026080500.nc"),
            "got {}",
            url
        );

        let url = grid_member_url("data.example.int/", &creds(), "20260805", 50);
        assert!(url.ends_with("dis_50_2026080500.nc"), "got {}", url);
    }
}
