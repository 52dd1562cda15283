//! Read-only access to the input sensor image.

use crate::error::{GeorefError, Result};
use image::{DynamicImage, ImageError};
use std::path::Path;
use tracing::info;

/// Single-band source image with intensities stored as `f32`.
///
/// Integer images keep their raw intensity values (no normalization), so a
/// zero in the file is exactly `0.0` here.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl SourceRaster {
    /// Open and decode an image file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GeorefError::FileNotFound(path.to_path_buf()));
        }

        let img = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => GeorefError::Io(io),
            other => GeorefError::UnsupportedFormat(format!("{}: {}", path.display(), other)),
        })?;
        let raster = Self::from_image(img)?;

        info!(
            path = %path.display(),
            width = raster.width,
            height = raster.height,
            "Loaded source image"
        );
        Ok(raster)
    }

    /// Convert a decoded image to a single intensity band.
    pub fn from_image(img: DynamicImage) -> Result<Self> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        if width == 0 || height == 0 {
            return Err(GeorefError::UnsupportedFormat(
                "image has no pixels".to_string(),
            ));
        }

        let data: Vec<f32> = match img {
            DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
            DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
            DynamicImage::ImageLumaA8(buf) => {
                buf.into_raw().chunks_exact(2).map(|p| f32::from(p[0])).collect()
            }
            DynamicImage::ImageLumaA16(buf) => {
                buf.into_raw().chunks_exact(2).map(|p| f32::from(p[0])).collect()
            }
            // Color imagery is reduced to luminance
            other => other.to_luma8().into_raw().into_iter().map(f32::from).collect(),
        };

        Self::from_data(width, height, data)
    }

    /// Wrap an existing row-major intensity buffer.
    pub fn from_data(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(GeorefError::UnsupportedFormat(format!(
                "buffer of {} samples does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels (xSize).
    pub fn x_size(&self) -> usize {
        self.width
    }

    /// Height in pixels (ySize).
    pub fn y_size(&self) -> usize {
        self.height
    }

    /// Intensity at (row, col). Callers must stay within bounds.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.height && col < self.width);
        self.data[row * self.width + col]
    }

    /// Row-major samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}
