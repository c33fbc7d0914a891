/// Zonal sampling boundary: per-admin-area maxima over a member grid.
///
/// Admin-area boundaries and their rasterization to the forecast grid are
/// the geometry service's responsibility. It hands this pipeline a zone
/// raster: one row per grid cell covered by an admin area, carrying the
/// cell's coordinates and the raw numeric zone id. Sampling a member grid
/// then reduces to a per-zone maximum over those cells — no polygon math
/// in this crate.
///
/// The in-tree sampler reads member grids with the `netcdf` crate and is
/// gated behind the `grid-netcdf` feature, since libnetcdf is not present
/// on every host. Builds without the feature get a distinguished error
/// instead of a sampler.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::model::FetchError;

// ---------------------------------------------------------------------------
// Sampler boundary
// ---------------------------------------------------------------------------

/// One zonal maximum: a zone's peak discharge at one lead-time step of one
/// ensemble member grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalRow {
    /// Raw numeric zone id; the grid extraction strategy reconstructs the
    /// admin placecode from it.
    pub zone: i64,
    pub lead_time_days: u32,
    pub discharge: f64,
}

/// Reduces one member grid file to per-zone maxima, one row per
/// (zone, lead-time step).
pub trait ZonalSampler {
    fn member_maxima(&self, grid_path: &Path) -> Result<Vec<ZonalRow>, FetchError>;
}

/// Builds the configured sampler for a country's zone raster.
///
/// Returns `GridFeatureDisabled` when the crate was built without
/// `grid-netcdf`; grid countries cannot run on such a build.
#[cfg(feature = "grid-netcdf")]
pub fn configured_sampler(zone_raster: &Path) -> Result<Box<dyn ZonalSampler>, FetchError> {
    let raster = load_zone_raster(zone_raster)?;
    Ok(Box::new(NetcdfSampler::new(raster)))
}

#[cfg(not(feature = "grid-netcdf"))]
pub fn configured_sampler(_zone_raster: &Path) -> Result<Box<dyn ZonalSampler>, FetchError> {
    Err(FetchError::GridFeatureDisabled)
}

// ---------------------------------------------------------------------------
// Zone raster
// ---------------------------------------------------------------------------

/// One rasterized cell of an admin area.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCell {
    pub latitude: f64,
    pub longitude: f64,
    pub zone: i64,
}

/// The rasterized admin areas for one country.
#[derive(Debug, Clone)]
pub struct ZoneRaster {
    pub cells: Vec<ZoneCell>,
}

/// Loads a zone raster CSV (`lat,lon,zone`) produced by the geometry
/// service.
pub fn load_zone_raster(path: &Path) -> Result<ZoneRaster, FetchError> {
    let contents = fs::read_to_string(path)?;
    parse_zone_raster(&contents)
        .map_err(|e| FetchError::Zonal(format!("{}: {}", path.display(), e)))
}

/// Parses zone raster CSV text. Header order is fixed (`lat,lon,zone`);
/// blank lines are ignored.
pub fn parse_zone_raster(contents: &str) -> Result<ZoneRaster, String> {
    let mut lines = contents.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or("empty zone raster")?;
    if header.trim() != "lat,lon,zone" {
        return Err(format!("unexpected zone raster header: '{}'", header.trim()));
    }

    let mut cells = Vec::new();
    for (lineno, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(format!("line {}: expected 3 fields, got {}", lineno + 2, fields.len()));
        }
        let latitude: f64 = fields[0]
            .parse()
            .map_err(|e| format!("line {}: bad lat: {}", lineno + 2, e))?;
        let longitude: f64 = fields[1]
            .parse()
            .map_err(|e| format!("line {}: bad lon: {}", lineno + 2, e))?;
        let zone: i64 = fields[2]
            .parse()
            .map_err(|e| format!("line {}: bad zone: {}", lineno + 2, e))?;
        cells.push(ZoneCell {
            latitude,
            longitude,
            zone,
        });
    }

    if cells.is_empty() {
        return Err("zone raster has no cells".to_string());
    }
    Ok(ZoneRaster { cells })
}

// ---------------------------------------------------------------------------
// Member CSV emission
// ---------------------------------------------------------------------------

/// Writes one member's zonal maxima as `glofas_<member>.csv` in the grid
/// input directory. Lead times use the underscored label (`3_day`) that the
/// grid extraction strategy expects.
pub fn write_member_csv(
    grid_dir: &Path,
    member: u32,
    rows: &[ZonalRow],
) -> Result<PathBuf, FetchError> {
    let path = grid_dir.join(format!("glofas_{}.csv", member));
    let mut out = File::create(&path)?;

    writeln!(out, "pcode,ensemble,leadTime,dis")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{}_day,{}",
            row.zone, member, row.lead_time_days, row.discharge
        )?;
    }

    Ok(path)
}

// ---------------------------------------------------------------------------
// NetCDF sampler (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "grid-netcdf")]
mod netcdf_sampler {
    use super::*;
    use crate::model::LEAD_TIME_STEPS;
    use std::collections::BTreeMap;

    /// Samples member grids via libnetcdf, taking per-zone maxima against a
    /// preloaded zone raster. Member files carry a `dis` variable with
    /// dimensions (time, lat, lon); cells are matched to grid indexes by
    /// nearest coordinate within half a grid spacing.
    pub struct NetcdfSampler {
        raster: ZoneRaster,
    }

    impl NetcdfSampler {
        pub fn new(raster: ZoneRaster) -> Self {
            NetcdfSampler { raster }
        }
    }

    /// Index of the coordinate nearest to `target`, or None when the match
    /// is further than half the local grid spacing (cell outside the grid).
    fn nearest_index(coords: &[f64], target: f64) -> Option<usize> {
        if coords.is_empty() {
            return None;
        }
        let spacing = if coords.len() > 1 {
            (coords[1] - coords[0]).abs()
        } else {
            f64::INFINITY
        };

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, &c) in coords.iter().enumerate() {
            let dist = (c - target).abs();
            if dist < best_dist {
                best = i;
                best_dist = dist;
            }
        }

        if best_dist <= spacing / 2.0 {
            Some(best)
        } else {
            None
        }
    }

    /// Fill values and packed-data artifacts must not win a maximum.
    fn is_valid(v: f64) -> bool {
        v.is_finite() && v.abs() < 1.0e30
    }

    fn read_coord(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>, FetchError> {
        for name in names {
            if let Some(var) = file.variable(name) {
                let data: Vec<f64> = var
                    .get_values(..)
                    .map_err(|e| FetchError::Zonal(e.to_string()))?;
                return Ok(data);
            }
        }
        Err(FetchError::Zonal(format!(
            "missing coordinate variable ({})",
            names.join(" or ")
        )))
    }

    impl ZonalSampler for NetcdfSampler {
        fn member_maxima(&self, grid_path: &Path) -> Result<Vec<ZonalRow>, FetchError> {
            let file = netcdf::open(grid_path).map_err(|e| FetchError::Zonal(e.to_string()))?;

            let lat = read_coord(&file, &["lat", "latitude"])?;
            let lon = read_coord(&file, &["lon", "longitude"])?;

            let var = file
                .variable("dis")
                .ok_or_else(|| FetchError::Zonal("missing 'dis' variable".to_string()))?;
            let dims = var.dimensions();
            if dims.len() != 3 {
                return Err(FetchError::Zonal(format!(
                    "'dis' must be (time, lat, lon), got {} dimensions",
                    dims.len()
                )));
            }
            let n_time = dims[0].len();
            let n_lat = dims[1].len();
            let n_lon = dims[2].len();

            let values: Vec<f64> = var
                .get_values(..)
                .map_err(|e| FetchError::Zonal(e.to_string()))?;

            let steps = (n_time as u32).min(LEAD_TIME_STEPS);
            let mut maxima: BTreeMap<(i64, u32), f64> = BTreeMap::new();

            for cell in &self.raster.cells {
                let (Some(li), Some(lj)) = (
                    nearest_index(&lat, cell.latitude),
                    nearest_index(&lon, cell.longitude),
                ) else {
                    continue; // cell outside this grid's extent
                };

                for step in 0..steps {
                    let idx = step as usize * n_lat * n_lon + li * n_lon + lj;
                    let v = values[idx];
                    if !is_valid(v) {
                        continue;
                    }
                    let entry = maxima.entry((cell.zone, step + 1)).or_insert(f64::NEG_INFINITY);
                    if v > *entry {
                        *entry = v;
                    }
                }
            }

            Ok(maxima
                .into_iter()
                .filter(|(_, v)| v.is_finite())
                .map(|((zone, lead_time_days), discharge)| ZonalRow {
                    zone,
                    lead_time_days,
                    discharge,
                })
                .collect())
        }
    }
}

#[cfg(feature = "grid-netcdf")]
pub use netcdf_sampler::NetcdfSampler;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zone_raster_reads_cells() {
        let raster = parse_zone_raster("lat,lon,zone\n4.85,31.6,101\n4.95,31.6,101\n5.05,31.7,102\n")
            .expect("valid raster should parse");
        assert_eq!(raster.cells.len(), 3);
        assert_eq!(raster.cells[0].zone, 101);
        assert_eq!(raster.cells[2].zone, 102);
        assert!((raster.cells[0].latitude - 4.85).abs() < 1e-12);
    }

    #[test]
    fn test_parse_zone_raster_rejects_wrong_header() {
        let err = parse_zone_raster("x,y,z\n1,2,3\n").unwrap_err();
        assert!(err.contains("header"), "got: {}", err);
    }

    #[test]
    fn test_parse_zone_raster_rejects_empty_body() {
        assert!(parse_zone_raster("lat,lon,zone\n").is_err());
        assert!(parse_zone_raster("").is_err());
    }

    #[test]
    fn test_parse_zone_raster_rejects_short_row() {
        let err = parse_zone_raster("lat,lon,zone\n4.85,31.6\n").unwrap_err();
        assert!(err.contains("expected 3 fields"), "got: {}", err);
    }

    #[test]
    fn test_write_member_csv_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rows = vec![
            ZonalRow {
                zone: 101,
                lead_time_days: 1,
                discharge: 240.5,
            },
            ZonalRow {
                zone: 102,
                lead_time_days: 3,
                discharge: 612.0,
            },
        ];
        let path = write_member_csv(dir.path(), 7, &rows).expect("write should succeed");
        assert!(path.ends_with("glofas_7.csv"));

        let written = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "pcode,ensemble,leadTime,dis");
        assert_eq!(lines[1], "101,7,1_day,240.5");
        assert_eq!(lines[2], "102,7,3_day,612");
    }

    #[cfg(not(feature = "grid-netcdf"))]
    #[test]
    fn test_configured_sampler_requires_feature() {
        let result = configured_sampler(Path::new("zones_SSD.csv"));
        assert!(matches!(result, Err(FetchError::GridFeatureDisabled)));
    }
}
