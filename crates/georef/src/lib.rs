//! GCP-driven georeferencing engine for satellite sensor imagery.
//!
//! Converts a raw sensor image (rows/columns in sensor geometry) into a
//! georeferenced GeoTIFF using a regular grid of ground control points.
//!
//! # Architecture
//!
//! ```text
//! GcpGrid::load(path)        SourceRaster::load(path)
//!      │                            │
//!      ▼                            │
//! GeometricModel::for_mode(grid, Utm | Geographic)
//!      │                            │
//!      └──────────┬─────────────────┘
//!                 ▼
//!      Warper::warp(zeros_as_nodata)
//!                 │
//!                 ├─► compute output extent + ground sample distance
//!                 ├─► per output cell: map → pixel (Newton) → sample
//!                 ▼
//!           OutputRaster
//!                 │
//!                 ▼
//!   OutputRasterWriter::write(raster, dest)   (temp file + atomic rename)
//! ```
//!
//! [`Engine`] wraps the pipeline in the `Idle → Running → {Succeeded, Failed}`
//! state machine and rejects concurrent warps or reloads with `Busy`.
//!
//! # Example
//!
//! ```ignore
//! use georef::{Engine, EngineConfig, ProjectionMode, WarpOptions};
//!
//! let engine = Engine::new(EngineConfig::default());
//! engine.set_source("pass.jpg")?;
//! engine.load_gcp("pass.gcp")?;
//! engine.set_destination("pass_37N.tif")?;
//! let report = engine.warp(WarpOptions::new(ProjectionMode::Utm, true))?;
//! println!("{}x{} in {}", report.width, report.height, report.crs);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gcp;
pub mod interpolation;
pub mod model;
pub mod naming;
pub mod source;
pub mod types;
pub mod warper;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, WarpEvent, WarpStatus};
pub use error::{ErrorKind, GeorefError, Result};
pub use gcp::{GcpGrid, GcpPoint};
pub use geo_common::{BoundingBox, Crs, GeoPoint, Hemisphere};
pub use geotiff::Compression;
pub use model::GeometricModel;
pub use source::SourceRaster;
pub use types::{
    GeoTransform, InterpolationMethod, OutputRaster, ProjectionMode, WarpOptions, WarpReport,
};
pub use warper::{WarpStats, Warper};
pub use writer::OutputRasterWriter;
