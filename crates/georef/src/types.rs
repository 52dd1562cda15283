//! Core types for warping.

use crate::error::{GeorefError, Result};
use geo_common::Crs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Interpolation method for source sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Nearest neighbor (preserves exact values).
    #[default]
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    Bilinear,
    /// Bicubic interpolation (smoothest, more compute).
    Cubic,
}

impl FromStr for InterpolationMethod {
    type Err = GeorefError;

    /// Parse from string (case-insensitive). Unknown names are rejected.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "cubic" | "bicubic" => Ok(Self::Cubic),
            _ => Err(GeorefError::InvalidConfig(format!(
                "unknown interpolation '{}' (expected nearest, bilinear or cubic)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// Output coordinate system requested for a warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// WGS84 latitude/longitude axes.
    #[default]
    Geographic,
    /// UTM with the zone derived from the GCP centroid.
    Utm,
}

impl ProjectionMode {
    pub fn from_use_utm(use_utm: bool) -> Self {
        if use_utm {
            Self::Utm
        } else {
            Self::Geographic
        }
    }
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geographic => write!(f, "geographic"),
            Self::Utm => write!(f, "utm"),
        }
    }
}

/// Per-warp options, passed explicitly to every warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarpOptions {
    pub projection: ProjectionMode,
    /// Treat sampled intensities of exactly zero as nodata.
    pub zeros_as_nodata: bool,
}

impl WarpOptions {
    pub fn new(projection: ProjectionMode, zeros_as_nodata: bool) -> Self {
        Self {
            projection,
            zeros_as_nodata,
        }
    }
}

/// North-up affine geotransform.
///
/// `origin` is the outer corner of the top-left cell; `pixel_height` is
/// positive and measured downward (southward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Output-axis coordinate of the center of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// GDAL-ordered coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            -self.pixel_height,
        ]
    }
}

/// Warped raster held in memory until handed to the writer.
#[derive(Debug, Clone)]
pub struct OutputRaster {
    /// Row-major samples, NaN = nodata.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub geotransform: GeoTransform,
    pub crs: Crs,
}

impl OutputRaster {
    /// Create a raster filled with nodata.
    pub fn new(width: usize, height: usize, geotransform: GeoTransform, crs: Crs) -> Self {
        Self {
            data: vec![f32::NAN; width * height],
            width,
            height,
            geotransform,
            crs,
        }
    }

    /// Get the value at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    /// Count cells that carry a value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Summary of a completed warp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpReport {
    pub width: usize,
    pub height: usize,
    pub geotransform: GeoTransform,
    pub crs: Crs,
    pub valid_cells: usize,
    pub nodata_cells: usize,
    /// Cells whose inverse mapping did not converge.
    pub inverse_misses: usize,
    pub destination: PathBuf,
}
