//! GeoTIFF output for single-band Float32 rasters.
//!
//! Files are encoded with the `tiff` crate and carry:
//! - Float32 samples with NaN nodata (`GDAL_NODATA` tag)
//! - Optional Deflate compression
//! - ModelPixelScale / ModelTiepoint georeferencing with a GeoKey directory
//!   for WGS84 geographic or WGS84 / UTM
//!
//! [`decode_geotiff`] reads such files back through `tiff`'s decoder.

pub mod encoder;
pub mod error;
pub mod geokeys;
pub mod inspect;

pub use encoder::{encode_geotiff, write_geotiff, Compression, Georeference};
pub use error::{GeoTiffError, GeoTiffResult};
pub use inspect::{decode_geotiff, GeoTiffInfo};
