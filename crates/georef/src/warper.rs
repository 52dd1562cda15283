//! Resampling of the source image into the output grid.
//!
//! For every output cell the warper takes the cell center in output axes,
//! inverts it to a source pixel through the [`GeometricModel`] and samples
//! the [`SourceRaster`]. Rows are independent: each starts its Newton seed
//! afresh and writes only its own slice of the output buffer, so the
//! parallel and sequential paths produce identical rasters.

use crate::config::EngineConfig;
use crate::error::{GeorefError, Result};
use crate::interpolation::{in_bounds, interpolate};
use crate::model::GeometricModel;
use crate::source::SourceRaster;
use crate::types::{GeoTransform, OutputRaster};
use geo_common::{BoundingBox, Crs};
use rayon::prelude::*;
use std::ops::Add;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Per-warp cell counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarpStats {
    /// Cells holding a sampled value.
    pub valid: usize,
    /// Cells left as nodata (outside the source, misses, zeros).
    pub nodata: usize,
    /// Cells whose inverse mapping did not converge.
    pub misses: usize,
}

impl Add for WarpStats {
    type Output = WarpStats;

    fn add(self, other: WarpStats) -> WarpStats {
        WarpStats {
            valid: self.valid + other.valid,
            nodata: self.nodata + other.nodata,
            misses: self.misses + other.misses,
        }
    }
}

/// Output grid layout chosen for a warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputExtent {
    pub width: usize,
    pub height: usize,
    pub geotransform: GeoTransform,
    /// Bounding box in output axes before snapping to whole cells.
    pub bbox: BoundingBox,
}

/// Warps one source image through one geometric model.
pub struct Warper<'a> {
    model: &'a GeometricModel,
    source: &'a SourceRaster,
    config: &'a EngineConfig,
}

impl<'a> Warper<'a> {
    pub fn new(model: &'a GeometricModel, source: &'a SourceRaster, config: &'a EngineConfig) -> Self {
        Self {
            model,
            source,
            config,
        }
    }

    /// Bounding box in output axes of the source footprint and the GCP grid.
    ///
    /// The source boundary is traced through every edge pixel center so
    /// curved edges are covered.
    pub fn footprint(&self) -> BoundingBox {
        let max_row = (self.source.y_size() - 1) as f64;
        let max_col = (self.source.x_size() - 1) as f64;
        let mut bbox = BoundingBox::empty();

        let mut add = |row: f64, col: f64| {
            let (x, y) = self.model.pixel_to_map(row, col);
            bbox.include(x, y);
        };

        for col in 0..self.source.x_size() {
            add(0.0, col as f64);
            add(max_row, col as f64);
        }
        for row in 0..self.source.y_size() {
            add(row as f64, 0.0);
            add(row as f64, max_col);
        }
        for p in self.model.grid().points() {
            add(p.pixel_row, p.pixel_col);
        }

        bbox
    }

    /// Ground sample distance in output-axis units.
    pub fn ground_sample_distance(&self) -> f64 {
        let configured = match self.model.crs() {
            Crs::Geographic => self.config.geographic_resolution_deg,
            Crs::Utm { .. } => self.config.utm_resolution_m,
        };
        configured.unwrap_or_else(|| self.model.mean_pixel_footprint())
    }

    /// Choose the output grid: north-up, square cells of the ground sample
    /// distance, origin at the bounding box's top-left corner.
    pub fn output_extent(&self) -> Result<OutputExtent> {
        let bbox = self.footprint();
        let gsd = self.ground_sample_distance();

        if !(bbox.width().is_finite() && bbox.height().is_finite()) || bbox.is_degenerate() {
            return Err(GeorefError::DegenerateExtent(format!(
                "bounding box [{}, {}, {}, {}] has no area",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            )));
        }
        if !(gsd.is_finite() && gsd > 0.0) {
            return Err(GeorefError::DegenerateExtent(format!(
                "ground sample distance {} is not positive",
                gsd
            )));
        }

        let cols = (bbox.width() / gsd).ceil().max(1.0);
        let rows = (bbox.height() / gsd).ceil().max(1.0);
        let limit = self.config.max_output_pixels;
        if cols * rows > limit as f64 {
            return Err(GeorefError::OutputTooLarge {
                width: cols.min(usize::MAX as f64) as usize,
                height: rows.min(usize::MAX as f64) as usize,
                limit,
            });
        }

        let extent = OutputExtent {
            width: cols as usize,
            height: rows as usize,
            geotransform: GeoTransform::new(bbox.min_x, bbox.max_y, gsd, gsd),
            bbox,
        };
        debug!(
            min_x = bbox.min_x,
            min_y = bbox.min_y,
            max_x = bbox.max_x,
            max_y = bbox.max_y,
            gsd = gsd,
            width = extent.width,
            height = extent.height,
            "Computed output extent"
        );
        Ok(extent)
    }

    /// Resample the whole output grid.
    ///
    /// `cancel` is polled between cells; once set the warp stops with
    /// [`GeorefError::Cancelled`].
    pub fn warp(&self, zeros_as_nodata: bool, cancel: &AtomicBool) -> Result<(OutputRaster, WarpStats)> {
        let extent = self.output_extent()?;
        let mut raster = OutputRaster::new(
            extent.width,
            extent.height,
            extent.geotransform,
            self.model.crs(),
        );

        info!(
            width = extent.width,
            height = extent.height,
            crs = %raster.crs,
            interpolation = %self.config.interpolation,
            parallel = self.config.parallel,
            "Warping"
        );

        let gt = extent.geotransform;
        let width = extent.width;
        let rows: Vec<WarpStats> = if self.config.parallel {
            raster
                .data
                .par_chunks_mut(width)
                .enumerate()
                .map(|(row, out)| self.warp_row(row, out, &gt, zeros_as_nodata, cancel))
                .collect::<Result<Vec<_>>>()?
        } else {
            raster
                .data
                .chunks_mut(width)
                .enumerate()
                .map(|(row, out)| self.warp_row(row, out, &gt, zeros_as_nodata, cancel))
                .collect::<Result<Vec<_>>>()?
        };
        let stats = rows.into_iter().fold(WarpStats::default(), |a, b| a + b);

        if stats.misses > 0 {
            warn!(misses = stats.misses, "Inverse mapping did not converge for some cells");
        }
        debug!(
            valid = stats.valid,
            nodata = stats.nodata,
            misses = stats.misses,
            "Warp complete"
        );
        Ok((raster, stats))
    }

    fn warp_row(
        &self,
        row: usize,
        out: &mut [f32],
        gt: &GeoTransform,
        zeros_as_nodata: bool,
        cancel: &AtomicBool,
    ) -> Result<WarpStats> {
        let (src_w, src_h) = (self.source.x_size(), self.source.y_size());
        let data = self.source.data();
        let method = self.config.interpolation;
        let mut stats = WarpStats::default();
        let mut seed = None;

        for (col, cell) in out.iter_mut().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(GeorefError::Cancelled);
            }

            let (x, y) = gt.cell_center(row, col);
            let value = match self.model.map_to_pixel(x, y, seed) {
                None => {
                    stats.misses += 1;
                    f32::NAN
                }
                Some((src_row, src_col)) => {
                    seed = Some((src_row, src_col));
                    if in_bounds(src_w, src_h, src_col, src_row) {
                        let v = interpolate(method, data, src_w, src_h, src_col, src_row);
                        if zeros_as_nodata && v == 0.0 {
                            f32::NAN
                        } else {
                            v
                        }
                    } else {
                        f32::NAN
                    }
                }
            };

            if value.is_nan() {
                stats.nodata += 1;
            } else {
                stats.valid += 1;
            }
            *cell = value;
        }

        Ok(stats)
    }
}
