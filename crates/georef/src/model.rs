//! Piecewise-bilinear pixel ↔ geographic model over a GCP grid.
//!
//! Each grid cell maps its unit square `(u, v)` onto the quadrilateral
//! spanned by its four corner control points:
//!
//! ```text
//! P(u, v) = P00 (1-u)(1-v) + P01 u (1-v) + P10 (1-u) v + P11 u v
//! ```
//!
//! with `u = col / x_step - cell_col` and `v = row / y_step - cell_row`.
//! Pixels outside the grid use the nearest edge cell (clamped selection),
//! so `u`/`v` extrapolate beyond `[0, 1]`.
//!
//! The inverse mapping runs Newton iterations on the same function. A
//! target that does not converge within the iteration bound is a miss
//! (`None`), which the warper turns into nodata.

use crate::error::{GeorefError, Result};
use crate::gcp::GcpGrid;
use crate::types::ProjectionMode;
use geo_common::Crs;
use nalgebra::{Matrix2, Vector2};
use projection::Projector;
use std::sync::Arc;
use tracing::debug;

/// Newton step size (pixels) below which the inverse has converged.
const CONVERGENCE_PX: f64 = 1e-6;

/// Normalized Jacobian determinant below which a cell is singular.
const SINGULAR_EPSILON: f64 = 1e-9;

/// Default Newton iteration bound.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Fitted mapping between source pixels and output coordinates.
#[derive(Debug, Clone)]
pub struct GeometricModel {
    grid: Arc<GcpGrid>,
    projector: Projector,
    max_iterations: usize,
}

impl GeometricModel {
    /// Build a geographic (WGS84) model.
    pub fn build(grid: Arc<GcpGrid>) -> Result<Self> {
        Self::build_with_crs(grid, Crs::Geographic, DEFAULT_MAX_ITERATIONS)
    }

    /// Build a model for the requested projection mode. UTM resolves its
    /// zone from the grid centroid.
    pub fn for_mode(grid: Arc<GcpGrid>, mode: ProjectionMode, max_iterations: usize) -> Result<Self> {
        let crs = match mode {
            ProjectionMode::Geographic => Crs::Geographic,
            ProjectionMode::Utm => grid.utm_crs(),
        };
        Self::build_with_crs(grid, crs, max_iterations)
    }

    /// Build a model with an explicit output CRS.
    pub fn build_with_crs(grid: Arc<GcpGrid>, crs: Crs, max_iterations: usize) -> Result<Self> {
        if max_iterations == 0 {
            return Err(GeorefError::InvalidConfig(
                "max_newton_iterations must be > 0".to_string(),
            ));
        }
        check_cells(&grid)?;
        debug!(
            crs = %crs,
            rows = grid.y_size(),
            cols = grid.x_size(),
            "Built geometric model"
        );
        Ok(Self {
            grid,
            projector: Projector::new(crs),
            max_iterations,
        })
    }

    pub fn grid(&self) -> &GcpGrid {
        &self.grid
    }

    /// Output CRS.
    pub fn crs(&self) -> Crs {
        self.projector.crs()
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Geographic coordinate `(lat, lon)` of a pixel position.
    pub fn pixel_to_geo(&self, row: f64, col: f64) -> (f64, f64) {
        let (cr, cc) = self.cell_for(row, col);
        let (u, v) = self.local(row, col, cr, cc);
        let (lon, lat) = self.eval(cr, cc, u, v);
        (lat, lon)
    }

    /// Output-axis coordinate `(x, y)` of a pixel position.
    pub fn pixel_to_map(&self, row: f64, col: f64) -> (f64, f64) {
        let (lat, lon) = self.pixel_to_geo(row, col);
        self.projector.forward(lat, lon)
    }

    /// Pixel position `(row, col)` of a geographic coordinate.
    ///
    /// `seed` is a nearby solved pixel, typically the previous output cell.
    /// Returns `None` when the iteration does not converge.
    pub fn geo_to_pixel(&self, lat: f64, lon: f64, seed: Option<(f64, f64)>) -> Option<(f64, f64)> {
        let target = Vector2::new(lon, lat);
        if let Some(start) = seed {
            if let Some(found) = self.newton(target, start) {
                return Some(found);
            }
        }
        self.newton(target, self.nearest_node(target))
    }

    /// Pixel position `(row, col)` of an output-axis coordinate.
    pub fn map_to_pixel(&self, x: f64, y: f64, seed: Option<(f64, f64)>) -> Option<(f64, f64)> {
        let (lat, lon) = self.projector.inverse(x, y);
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        self.geo_to_pixel(lat, lon, seed)
    }

    /// Average output-axis distance covered by one source pixel, from the
    /// spacing of adjacent grid nodes.
    pub fn mean_pixel_footprint(&self) -> f64 {
        let grid = &self.grid;
        let map: Vec<(f64, f64)> = grid
            .points()
            .map(|p| self.projector.forward(p.lat, p.lon))
            .collect();
        let at = |r: usize, c: usize| map[r * grid.x_size() + c];
        let dist = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).hypot(a.1 - b.1);

        let mut horizontal = 0.0;
        let mut h_count = 0usize;
        let mut vertical = 0.0;
        let mut v_count = 0usize;
        for r in 0..grid.y_size() {
            for c in 0..grid.x_size() {
                if c + 1 < grid.x_size() {
                    horizontal += dist(at(r, c), at(r, c + 1));
                    h_count += 1;
                }
                if r + 1 < grid.y_size() {
                    vertical += dist(at(r, c), at(r + 1, c));
                    v_count += 1;
                }
            }
        }

        let h = horizontal / h_count as f64 / grid.x_step() as f64;
        let v = vertical / v_count as f64 / grid.y_step() as f64;
        (h + v) / 2.0
    }

    /// Clamped cell `(row, col)` containing a pixel position.
    #[inline]
    fn cell_for(&self, row: f64, col: f64) -> (usize, usize) {
        let clamp = |value: f64, step: usize, cells: usize| -> usize {
            let idx = (value / step as f64).floor();
            if idx.is_nan() || idx < 0.0 {
                0
            } else {
                (idx as usize).min(cells - 1)
            }
        };
        (
            clamp(row, self.grid.y_step(), self.grid.y_size() - 1),
            clamp(col, self.grid.x_step(), self.grid.x_size() - 1),
        )
    }

    #[inline]
    fn local(&self, row: f64, col: f64, cr: usize, cc: usize) -> (f64, f64) {
        (
            col / self.grid.x_step() as f64 - cc as f64,
            row / self.grid.y_step() as f64 - cr as f64,
        )
    }

    #[inline]
    fn corners(&self, cr: usize, cc: usize) -> [Vector2<f64>; 4] {
        let p = |r: usize, c: usize| {
            let n = self.grid.node(r, c);
            Vector2::new(n.lon, n.lat)
        };
        [p(cr, cc), p(cr, cc + 1), p(cr + 1, cc), p(cr + 1, cc + 1)]
    }

    /// Bilinear `(lon, lat)` at local coordinates of a cell.
    #[inline]
    fn eval(&self, cr: usize, cc: usize, u: f64, v: f64) -> (f64, f64) {
        let [p00, p01, p10, p11] = self.corners(cr, cc);
        let p = p00 * ((1.0 - u) * (1.0 - v)) + p01 * (u * (1.0 - v)) + p10 * ((1.0 - u) * v)
            + p11 * (u * v);
        (p.x, p.y)
    }

    fn newton(&self, target: Vector2<f64>, start: (f64, f64)) -> Option<(f64, f64)> {
        let x_step = self.grid.x_step() as f64;
        let y_step = self.grid.y_step() as f64;
        let (mut row, mut col) = start;

        for _ in 0..self.max_iterations {
            let (cr, cc) = self.cell_for(row, col);
            let (u, v) = self.local(row, col, cr, cc);
            let [p00, p01, p10, p11] = self.corners(cr, cc);

            let value = p00 * ((1.0 - u) * (1.0 - v)) + p01 * (u * (1.0 - v)) + p10 * ((1.0 - u) * v)
                + p11 * (u * v);
            let d_col = ((p01 - p00) * (1.0 - v) + (p11 - p10) * v) / x_step;
            let d_row = ((p10 - p00) * (1.0 - u) + (p11 - p01) * u) / y_step;

            let jacobian = Matrix2::from_columns(&[d_col, d_row]);
            let delta = jacobian.try_inverse()? * (target - value);

            col += delta.x;
            row += delta.y;
            if !row.is_finite() || !col.is_finite() {
                return None;
            }
            if delta.x.abs() < CONVERGENCE_PX && delta.y.abs() < CONVERGENCE_PX {
                return Some((row, col));
            }
        }
        None
    }

    /// Pixel position of the grid node closest to a `(lon, lat)` target.
    fn nearest_node(&self, target: Vector2<f64>) -> (f64, f64) {
        self.grid
            .points()
            .map(|p| (p, (p.lon - target.x).hypot(p.lat - target.y)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| (p.pixel_row, p.pixel_col))
            .unwrap_or((0.0, 0.0))
    }
}

/// Reject cells with coincident, collinear or folded corners.
///
/// The Jacobian determinant is evaluated at every cell corner; all of them
/// must be non-zero and share the orientation of the first cell.
fn check_cells(grid: &GcpGrid) -> Result<()> {
    let p = |r: usize, c: usize| {
        let n = grid.node(r, c);
        Vector2::new(n.lon, n.lat)
    };

    let mut orientation = 0.0f64;
    for cr in 0..grid.y_size() - 1 {
        for cc in 0..grid.x_size() - 1 {
            let (p00, p01, p10, p11) = (p(cr, cc), p(cr, cc + 1), p(cr + 1, cc), p(cr + 1, cc + 1));
            let singular = GeorefError::SingularFit { row: cr, col: cc };

            // (d/du, d/dv) at each corner
            let corners = [
                (p01 - p00, p10 - p00),
                (p01 - p00, p11 - p01),
                (p11 - p10, p10 - p00),
                (p11 - p10, p11 - p01),
            ];
            for (du, dv) in corners {
                let (lu, lv) = (du.norm(), dv.norm());
                if lu <= f64::EPSILON || lv <= f64::EPSILON {
                    return Err(singular);
                }
                let det = (du.x * dv.y - du.y * dv.x) / (lu * lv);
                if det.abs() < SINGULAR_EPSILON {
                    return Err(singular);
                }
                if orientation == 0.0 {
                    orientation = det.signum();
                } else if det.signum() != orientation {
                    return Err(singular);
                }
            }
        }
    }
    Ok(())
}
