//! Ground control point grid loading.
//!
//! A GCP file is plain text:
//!
//! ```text
//! # comment lines and blank lines are ignored
//! <rows> <cols> <row_step> <col_step>
//! <lat> <lon>                  (rows * cols records, row-major)
//! ```
//!
//! A record may also carry its pixel position, `<row> <col> <lat> <lon>`;
//! the position must then agree with the header steps. Fields may be
//! separated by whitespace or commas.

use crate::error::{GeorefError, Result};
use geo_common::{Crs, GeoPoint};
use std::path::Path;
use tracing::{debug, info};

/// Relative tolerance for the collinearity test.
const COLLINEAR_EPSILON: f64 = 1e-9;

/// A pixel coordinate paired with its geographic location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcpPoint {
    pub pixel_row: f64,
    pub pixel_col: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Regular grid of ground control points.
///
/// Node (r, c) sits at pixel (r * y_step, c * x_step).
#[derive(Debug, Clone)]
pub struct GcpGrid {
    rows: usize,
    cols: usize,
    row_step: usize,
    col_step: usize,
    /// Row-major geographic coordinates.
    nodes: Vec<GeoPoint>,
}

impl GcpGrid {
    /// Build a grid from row-major node coordinates.
    pub fn new(
        rows: usize,
        cols: usize,
        row_step: usize,
        col_step: usize,
        nodes: Vec<GeoPoint>,
    ) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(GeorefError::DegenerateGrid(format!(
                "grid must be at least 2x2, got {}x{}",
                rows, cols
            )));
        }
        if row_step == 0 || col_step == 0 {
            return Err(GeorefError::DegenerateGrid(format!(
                "grid steps must be positive, got row step {} and col step {}",
                row_step, col_step
            )));
        }
        if nodes.len() != rows * cols {
            return Err(GeorefError::RecordCountMismatch {
                expected: rows * cols,
                found: nodes.len(),
            });
        }
        if let Some(bad) = nodes.iter().position(|p| !p.is_valid()) {
            return Err(GeorefError::DegenerateGrid(format!(
                "node {} has invalid coordinates ({}, {})",
                bad, nodes[bad].lat, nodes[bad].lon
            )));
        }

        let grid = Self {
            rows,
            cols,
            row_step,
            col_step,
            nodes,
        };
        grid.check_collinear()?;
        Ok(grid)
    }

    /// Load and validate a GCP file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GeorefError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let grid = Self::parse(&text)?;
        info!(
            path = %path.display(),
            rows = grid.rows,
            cols = grid.cols,
            row_step = grid.row_step,
            col_step = grid.col_step,
            "Loaded GCP grid"
        );
        Ok(grid)
    }

    /// Parse GCP text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines
            .next()
            .ok_or_else(|| GeorefError::MalformedHeader("file is empty".to_string()))?;
        let (rows, cols, row_step, col_step) = parse_header(header)?;

        let mut nodes = Vec::with_capacity(rows.saturating_mul(cols).min(1 << 20));
        for (line_no, line) in lines {
            let index = nodes.len();
            let fields = split_fields(line)
                .map(|f| {
                    f.parse::<f64>().map_err(|_| {
                        GeorefError::malformed_record(line_no, format!("'{}' is not a number", f))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let (lat, lon) = match fields.as_slice() {
                [lat, lon] => (*lat, *lon),
                [row, col, lat, lon] => {
                    if cols > 0 && index < rows * cols {
                        let expected_row = (index / cols * row_step) as f64;
                        let expected_col = (index % cols * col_step) as f64;
                        if (row - expected_row).abs() > 1e-6 || (col - expected_col).abs() > 1e-6 {
                            return Err(GeorefError::malformed_record(
                                line_no,
                                format!(
                                    "pixel ({}, {}) does not match grid position ({}, {})",
                                    row, col, expected_row, expected_col
                                ),
                            ));
                        }
                    }
                    (*lat, *lon)
                }
                _ => {
                    return Err(GeorefError::malformed_record(
                        line_no,
                        format!("expected 2 or 4 fields, found {}", fields.len()),
                    ))
                }
            };

            let point = GeoPoint::new(lat, lon);
            if !point.is_valid() {
                return Err(GeorefError::malformed_record(
                    line_no,
                    format!("coordinate ({}, {}) out of range", lat, lon),
                ));
            }
            nodes.push(point);
        }

        debug!(records = nodes.len(), "Parsed GCP records");
        Self::new(rows, cols, row_step, col_step, nodes)
    }

    /// Number of grid columns (gcpXSize).
    pub fn x_size(&self) -> usize {
        self.cols
    }

    /// Number of grid rows (gcpYSize).
    pub fn y_size(&self) -> usize {
        self.rows
    }

    /// Pixel spacing between adjacent grid columns (gcpXStep).
    pub fn x_step(&self) -> usize {
        self.col_step
    }

    /// Pixel spacing between adjacent grid rows (gcpYStep).
    pub fn y_step(&self) -> usize {
        self.row_step
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Geographic coordinate of node (row, col).
    #[inline]
    pub fn node(&self, row: usize, col: usize) -> GeoPoint {
        self.nodes[row * self.cols + col]
    }

    /// Node (row, col) as a full control point.
    pub fn point(&self, row: usize, col: usize) -> GcpPoint {
        let geo = self.node(row, col);
        GcpPoint {
            pixel_row: (row * self.row_step) as f64,
            pixel_col: (col * self.col_step) as f64,
            lat: geo.lat,
            lon: geo.lon,
        }
    }

    /// All control points, row-major.
    pub fn points(&self) -> impl Iterator<Item = GcpPoint> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| self.point(r, c)))
    }

    /// Pixel extent spanned by the grid nodes `(max_row, max_col)`.
    pub fn pixel_extent(&self) -> (f64, f64) {
        (
            ((self.rows - 1) * self.row_step) as f64,
            ((self.cols - 1) * self.col_step) as f64,
        )
    }

    /// Mean latitude and longitude of all nodes.
    pub fn centroid(&self) -> GeoPoint {
        let n = self.nodes.len() as f64;
        let (lat, lon) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(a, b), p| (a + p.lat, b + p.lon));
        GeoPoint::new(lat / n, lon / n)
    }

    /// UTM CRS derived from the centroid.
    pub fn utm_crs(&self) -> Crs {
        let c = self.centroid();
        Crs::utm_for(c.lat, c.lon)
    }

    /// UTM zone number derived from the centroid longitude.
    pub fn utm_zone(&self) -> u8 {
        geo_common::utm_zone_for_longitude(self.centroid().lon)
    }

    /// Zone label such as "37N".
    pub fn utm_zone_label(&self) -> String {
        self.utm_crs().zone_label().unwrap_or_default()
    }

    /// Reject grids whose nodes all lie on one line (or one point).
    fn check_collinear(&self) -> Result<()> {
        let first = self.nodes[0];
        let (far, far_dist) = self
            .nodes
            .iter()
            .map(|p| (*p, (p.lon - first.lon).hypot(p.lat - first.lat)))
            .fold((first, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if far_dist <= f64::EPSILON {
            return Err(GeorefError::DegenerateGrid(
                "all control points coincide".to_string(),
            ));
        }

        let (dx, dy) = (far.lon - first.lon, far.lat - first.lat);
        let max_offset = self
            .nodes
            .iter()
            .map(|p| ((p.lon - first.lon) * dy - (p.lat - first.lat) * dx).abs() / far_dist)
            .fold(0.0, f64::max);

        if max_offset <= COLLINEAR_EPSILON * far_dist {
            return Err(GeorefError::DegenerateGrid(
                "all control points are collinear".to_string(),
            ));
        }
        Ok(())
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
}

fn parse_header(line: &str) -> Result<(usize, usize, usize, usize)> {
    let fields: Vec<&str> = split_fields(line).collect();
    if fields.len() != 4 {
        return Err(GeorefError::MalformedHeader(format!(
            "expected 'rows cols row_step col_step', got '{}'",
            line
        )));
    }

    let parse = |name: &str, value: &str| -> Result<usize> {
        value.parse::<usize>().map_err(|_| {
            GeorefError::MalformedHeader(format!("{} '{}' is not a non-negative integer", name, value))
        })
    };

    Ok((
        parse("rows", fields[0])?,
        parse("cols", fields[1])?,
        parse("row_step", fields[2])?,
        parse("col_step", fields[3])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let grid = GcpGrid::parse("2 2 100 50\n10 20\n10 21\n9 20\n9 21\n").unwrap();
        assert_eq!(grid.y_size(), 2);
        assert_eq!(grid.x_size(), 2);
        assert_eq!(grid.y_step(), 100);
        assert_eq!(grid.x_step(), 50);
        assert_eq!(grid.len(), 4);

        let p = grid.point(1, 1);
        assert_eq!((p.pixel_row, p.pixel_col), (100.0, 50.0));
        assert_eq!((p.lat, p.lon), (9.0, 21.0));
    }

    #[test]
    fn test_parse_comments_and_commas() {
        let text = "# pass 1234\n\n2,2,10,10\n0,0,10.0,20.0\n0,10,10.0,20.1\n10,0,9.9,20.0\n10,10,9.9,20.1\n";
        let grid = GcpGrid::parse(text).unwrap();
        assert_eq!(grid.points().count(), 4);
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            GcpGrid::parse(""),
            Err(GeorefError::MalformedHeader(_))
        ));
        assert!(matches!(
            GcpGrid::parse("2 2 10\n"),
            Err(GeorefError::MalformedHeader(_))
        ));
        assert!(matches!(
            GcpGrid::parse("2 x 10 10\n"),
            Err(GeorefError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_record_position_mismatch() {
        let text = "2 2 10 10\n0 0 10 20\n0 11 10 20.1\n10 0 9.9 20\n10 10 9.9 20.1\n";
        assert!(matches!(
            GcpGrid::parse(text),
            Err(GeorefError::MalformedRecord { line: 3, .. })
        ));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let text = "2 2 10 10\n95 20\n10 20.1\n9.9 20\n9.9 20.1\n";
        assert!(matches!(
            GcpGrid::parse(text),
            Err(GeorefError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_too_small_grid() {
        let err = GcpGrid::parse("1 3 10 10\n1 1\n1 2\n1 3\n").unwrap_err();
        assert!(matches!(err, GeorefError::DegenerateGrid(_)));
    }

    #[test]
    fn test_collinear_grid() {
        let text = "2 2 10 10\n0 0\n0 1\n0 2\n0 3\n";
        assert!(matches!(
            GcpGrid::parse(text),
            Err(GeorefError::DegenerateGrid(_))
        ));
    }

    #[test]
    fn test_centroid_and_zone() {
        let grid = GcpGrid::parse("2 2 10 10\n56 37\n56 38\n55 37\n55 38\n").unwrap();
        let c = grid.centroid();
        assert!((c.lat - 55.5).abs() < 1e-12);
        assert!((c.lon - 37.5).abs() < 1e-12);
        assert_eq!(grid.utm_zone(), 37);
        assert_eq!(grid.utm_zone_label(), "37N");
    }
}
