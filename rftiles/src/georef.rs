//! Geo-reference sidecar parsing.
//!
//! The propagation calculator writes a `.geo` file next to every raster,
//! binding the raster's pixel grid to a geographic bounding box:
//!
//! ```text
//! FILENAME	site.ppm
//! #		X	Y	Long		Lat
//! TIEPOINT	0	0	-10.000		50.000
//! TIEPOINT	1199	1199	-9.000		49.000
//! IMAGESIZE	1200	1200
//! ```
//!
//! The two tie points are opposite corners of the raster. Only their
//! geographic values are used; the raster is assumed to span its full
//! `IMAGESIZE` between them.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File extension of geo-reference sidecars.
pub const GEO_EXTENSION: &str = "geo";

/// Errors from reading or validating a geo-reference.
#[derive(Debug, Error)]
pub enum GeoRefError {
    /// The sidecar could not be read.
    #[error("Failed to read geo file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A line could not be parsed.
    #[error("Line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// Expected exactly two tie points.
    #[error("Expected 2 TIEPOINT entries, found {0}")]
    TiePointCount(usize),

    /// No IMAGESIZE entry.
    #[error("Missing IMAGESIZE entry")]
    MissingImageSize,

    /// The bounding box has no area.
    #[error("Degenerate bounding box: {0}")]
    Degenerate(String),
}

/// Bounding box and pixel dimensions of a source raster.
///
/// Corners are normalized on construction, so `north > south` and
/// `east > west` always hold. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    north: f64,
    south: f64,
    west: f64,
    east: f64,
    width: u32,
    height: u32,
}

impl GeoReference {
    /// Builds a geo-reference from two latitude and two longitude bounds.
    ///
    /// The bounds may be given in either order.
    pub fn new(
        lat_a: f64,
        lat_b: f64,
        lon_a: f64,
        lon_b: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, GeoRefError> {
        if ![lat_a, lat_b, lon_a, lon_b].iter().all(|v| v.is_finite()) {
            return Err(GeoRefError::Degenerate(
                "non-finite corner coordinate".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(GeoRefError::Degenerate(format!(
                "image size {}×{}",
                width, height
            )));
        }

        let (north, south) = (lat_a.max(lat_b), lat_a.min(lat_b));
        let (west, east) = (lon_a.min(lon_b), lon_a.max(lon_b));

        if north == south || east == west {
            return Err(GeoRefError::Degenerate(format!(
                "zero extent: lat {}..{}, lon {}..{}",
                south, north, west, east
            )));
        }

        Ok(Self {
            north,
            south,
            west,
            east,
            width,
            height,
        })
    }

    /// Parses the contents of a `.geo` sidecar.
    pub fn parse(content: &str) -> Result<Self, GeoRefError> {
        let mut tie_points: Vec<(f64, f64)> = Vec::with_capacity(2);
        let mut image_size: Option<(u32, u32)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(keyword) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();

            match keyword.to_ascii_uppercase().as_str() {
                "TIEPOINT" => {
                    if values.len() != 4 {
                        return Err(GeoRefError::Syntax {
                            line: line_no,
                            reason: format!("TIEPOINT needs 4 values, found {}", values.len()),
                        });
                    }
                    let lon = parse_number::<f64>(values[2], line_no)?;
                    let lat = parse_number::<f64>(values[3], line_no)?;
                    tie_points.push((lat, lon));
                }
                "IMAGESIZE" => {
                    if values.len() != 2 {
                        return Err(GeoRefError::Syntax {
                            line: line_no,
                            reason: format!("IMAGESIZE needs 2 values, found {}", values.len()),
                        });
                    }
                    let width = parse_number::<u32>(values[0], line_no)?;
                    let height = parse_number::<u32>(values[1], line_no)?;
                    image_size = Some((width, height));
                }
                // FILENAME and anything newer calculators add
                _ => {}
            }
        }

        if tie_points.len() != 2 {
            return Err(GeoRefError::TiePointCount(tie_points.len()));
        }
        let (width, height) = image_size.ok_or(GeoRefError::MissingImageSize)?;

        let (lat_a, lon_a) = tie_points[0];
        let (lat_b, lon_b) = tie_points[1];
        Self::new(lat_a, lat_b, lon_a, lon_b, width, height)
    }

    /// Reads and parses a `.geo` sidecar file.
    pub fn from_file(path: &Path) -> Result<Self, GeoRefError> {
        let content = std::fs::read_to_string(path).map_err(|source| GeoRefError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Northern latitude bound.
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Southern latitude bound.
    pub fn south(&self) -> f64 {
        self.south
    }

    /// Western longitude bound.
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Eastern longitude bound.
    pub fn east(&self) -> f64 {
        self.east
    }

    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Degrees of longitude covered by one pixel column.
    pub fn lon_per_pixel(&self) -> f64 {
        (self.east - self.west) / f64::from(self.width)
    }

    /// Degrees of latitude covered by one pixel row.
    pub fn lat_per_pixel(&self) -> f64 {
        (self.north - self.south) / f64::from(self.height)
    }
}

/// Returns the sidecar path for a raster: same stem, `.geo` extension.
pub fn sidecar_path(raster: &Path) -> PathBuf {
    raster.with_extension(GEO_EXTENSION)
}

fn parse_number<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, GeoRefError> {
    value.parse::<T>().map_err(|_| GeoRefError::Syntax {
        line,
        reason: format!("invalid number '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "FILENAME\tsite.ppm\n\
                          #\t\tX\tY\tLong\t\tLat\n\
                          TIEPOINT\t0\t0\t-10.000\t\t50.000\n\
                          TIEPOINT\t1199\t599\t-9.000\t\t49.000\n\
                          IMAGESIZE\t1200\t600\n\
                          #\n\
                          # Auto Generated by SPLAT!\n\
                          #\n";

    #[test]
    fn test_parse_splat_sidecar() {
        let georef = GeoReference::parse(SAMPLE).unwrap();
        assert_eq!(georef.north(), 50.0);
        assert_eq!(georef.south(), 49.0);
        assert_eq!(georef.west(), -10.0);
        assert_eq!(georef.east(), -9.0);
        assert_eq!(georef.width(), 1200);
        assert_eq!(georef.height(), 600);
        assert!((georef.lon_per_pixel() - 1.0 / 1200.0).abs() < 1e-15);
        assert!((georef.lat_per_pixel() - 1.0 / 600.0).abs() < 1e-15);
    }

    #[test]
    fn test_corners_are_normalized() {
        let a = GeoReference::new(49.0, 50.0, -9.0, -10.0, 10, 10).unwrap();
        let b = GeoReference::new(50.0, 49.0, -10.0, -9.0, 10, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_tiepoint() {
        let content = "TIEPOINT 0 0 -10.0 50.0\nIMAGESIZE 10 10\n";
        let err = GeoReference::parse(content).unwrap_err();
        assert!(matches!(err, GeoRefError::TiePointCount(1)));
    }

    #[test]
    fn test_missing_image_size() {
        let content = "TIEPOINT 0 0 -10.0 50.0\nTIEPOINT 9 9 -9.0 49.0\n";
        let err = GeoReference::parse(content).unwrap_err();
        assert!(matches!(err, GeoRefError::MissingImageSize));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let content = "TIEPOINT 0 0 west 50.0\n";
        match GeoReference::parse(content).unwrap_err() {
            GeoRefError::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_extent_rejected() {
        let content = "TIEPOINT 0 0 -10.0 50.0\nTIEPOINT 9 9 -10.0 49.0\nIMAGESIZE 10 10\n";
        let err = GeoReference::parse(content).unwrap_err();
        assert!(matches!(err, GeoRefError::Degenerate(_)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = GeoReference::new(50.0, 49.0, -10.0, -9.0, 0, 10).unwrap_err();
        assert!(matches!(err, GeoRefError::Degenerate(_)));
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/out/site-a.ppm")),
            PathBuf::from("/out/site-a.geo")
        );
    }

    #[test]
    fn test_from_file_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = GeoReference::from_file(&temp.path().join("nope.geo")).unwrap_err();
        assert!(matches!(err, GeoRefError::Read { .. }));
    }
}
