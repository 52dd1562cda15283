//! Error types for the georeferencing engine.

use std::path::PathBuf;
use thiserror::Error;

/// Category of a failure, surfaced to front ends as a coarse reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/unreadable inputs, bad formats, malformed GCP files.
    Input,
    /// Degenerate GCP grids and singular cell fits.
    Model,
    /// Output extent could not be resampled.
    Resampling,
    /// Destination not writable, disk exhaustion, rename failure.
    Output,
    /// Warp requested while not ready or while busy.
    State,
    /// Invalid engine configuration.
    Config,
}

/// Errors that can occur while loading inputs or warping.
#[derive(Error, Debug)]
pub enum GeorefError {
    /// Input file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Source image could not be decoded as a supported raster.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// GCP header line is missing or unparsable.
    #[error("malformed GCP header: {0}")]
    MalformedHeader(String),

    /// GCP coordinate record is unparsable or out of place.
    #[error("malformed GCP record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// GCP record count differs from the header's grid size.
    #[error("GCP record count mismatch: header declares {expected} points, found {found}")]
    RecordCountMismatch { expected: usize, found: usize },

    /// Grid cannot support interpolation (too small, zero steps, collinear).
    #[error("degenerate GCP grid: {0}")]
    DegenerateGrid(String),

    /// A grid cell has duplicate, collinear or folded corners.
    #[error("singular fit in GCP cell (row {row}, col {col})")]
    SingularFit { row: usize, col: usize },

    /// Warp requested before inputs were loaded.
    #[error("engine not ready: {0}")]
    NotReady(String),

    /// Another warp is running.
    #[error("engine busy: a warp is already running")]
    Busy,

    /// Output bounding box has no area.
    #[error("degenerate output extent: {0}")]
    DegenerateExtent(String),

    /// Output raster would exceed the configured pixel ceiling.
    #[error("output too large: {width}x{height} exceeds {limit} pixels")]
    OutputTooLarge {
        width: usize,
        height: usize,
        limit: usize,
    },

    /// Output could not be written or renamed into place.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Warp was cancelled before the output was committed.
    #[error("warp cancelled")]
    Cancelled,

    /// Background worker died before delivering a result.
    #[error("warp worker failed: {0}")]
    Worker(String),

    /// Configuration error.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeorefError {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeorefError::FileNotFound(_)
            | GeorefError::UnsupportedFormat(_)
            | GeorefError::MalformedHeader(_)
            | GeorefError::MalformedRecord { .. }
            | GeorefError::RecordCountMismatch { .. }
            | GeorefError::Io(_) => ErrorKind::Input,

            GeorefError::DegenerateGrid(_) | GeorefError::SingularFit { .. } => ErrorKind::Model,

            GeorefError::DegenerateExtent(_) | GeorefError::OutputTooLarge { .. } => {
                ErrorKind::Resampling
            }

            GeorefError::WriteFailed(_) => ErrorKind::Output,

            GeorefError::NotReady(_)
            | GeorefError::Busy
            | GeorefError::Cancelled
            | GeorefError::Worker(_) => ErrorKind::State,

            GeorefError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Stable result code for front ends.
    pub fn code(&self) -> &'static str {
        match self {
            GeorefError::FileNotFound(_) => "FileNotFound",
            GeorefError::UnsupportedFormat(_) => "UnsupportedFormat",
            GeorefError::MalformedHeader(_) => "MalformedHeader",
            GeorefError::MalformedRecord { .. } => "MalformedRecord",
            GeorefError::RecordCountMismatch { .. } => "RecordCountMismatch",
            GeorefError::DegenerateGrid(_) => "DegenerateGrid",
            GeorefError::SingularFit { .. } => "SingularFit",
            GeorefError::NotReady(_) => "NotReady",
            GeorefError::Busy => "Busy",
            GeorefError::DegenerateExtent(_) => "DegenerateExtent",
            GeorefError::OutputTooLarge { .. } => "OutputTooLarge",
            GeorefError::WriteFailed(_) => "WriteFailed",
            GeorefError::Cancelled => "Cancelled",
            GeorefError::Worker(_) => "Worker",
            GeorefError::InvalidConfig(_) => "InvalidConfig",
            GeorefError::Io(_) => "Io",
        }
    }

    /// Create a WriteFailed error.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Create a MalformedRecord error.
    pub fn malformed_record(line: usize, msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: msg.into(),
        }
    }
}

impl From<geotiff::GeoTiffError> for GeorefError {
    fn from(err: geotiff::GeoTiffError) -> Self {
        Self::WriteFailed(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, GeorefError>;
