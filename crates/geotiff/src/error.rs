//! Error types for GeoTIFF encoding and inspection.

use thiserror::Error;

/// Result type alias using GeoTiffError.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

#[derive(Debug, Error)]
pub enum GeoTiffError {
    #[error("invalid raster data: {0}")]
    InvalidData(String),

    #[error("unknown compression '{0}' (expected none or deflate)")]
    UnknownCompression(String),

    #[error("unsupported TIFF layout: {0}")]
    Unsupported(String),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
