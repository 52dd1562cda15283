//! GeoTIFF encoding for Float32 rasters.
//!
//! The image directory is written by `tiff`'s [`TiffEncoder`]; the GeoTIFF
//! tags are added to it before the samples. No timestamps are written, so
//! identical inputs give identical bytes.

use geo_common::Crs;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Seek, Write};
use std::str::FromStr;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::{DeflateLevel, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::geokeys::{build_geokey_directory, gdal_nodata_tag};

/// Compression for GeoTIFF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression - fastest but largest files
    None,
    /// Deflate (zlib) compression
    #[default]
    Deflate,
}

impl Compression {
    fn to_tiff(self) -> tiff::encoder::Compression {
        match self {
            Compression::None => tiff::encoder::Compression::Uncompressed,
            Compression::Deflate => tiff::encoder::Compression::Deflate(DeflateLevel::Fast),
        }
    }
}

impl FromStr for Compression {
    type Err = GeoTiffError;

    /// Case-insensitive; unknown names are rejected.
    fn from_str(s: &str) -> GeoTiffResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "deflate" | "zlib" => Ok(Self::Deflate),
            _ => Err(GeoTiffError::UnknownCompression(s.to_string())),
        }
    }
}

/// Placement of the raster on the map.
///
/// `origin_x`/`origin_y` is the outer corner of the top-left pixel;
/// `pixel_width`/`pixel_height` are positive sizes in CRS units, with rows
/// running towards decreasing y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georeference {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub crs: Crs,
}

/// Encode a single-band Float32 raster as GeoTIFF bytes.
///
/// # Arguments
/// * `data` - Samples in row-major order (top row first); NaN marks nodata
/// * `width` - Raster width in pixels
/// * `height` - Raster height in pixels
/// * `georef` - Pixel-to-map placement and CRS
/// * `compression` - Sample compression
pub fn encode_geotiff(
    data: &[f32],
    width: usize,
    height: usize,
    georef: &Georeference,
    compression: Compression,
) -> GeoTiffResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(data.len() * 4 / 2 + 1024));
    write_geotiff(&mut cursor, data, width, height, georef, compression)?;
    let tiff = cursor.into_inner();

    tracing::debug!(
        width,
        height,
        bytes = tiff.len(),
        crs = %georef.crs,
        "Encoded GeoTIFF"
    );
    Ok(tiff)
}

/// Encode a single-band Float32 raster as GeoTIFF into `writer`.
pub fn write_geotiff<W: Write + Seek>(
    writer: W,
    data: &[f32],
    width: usize,
    height: usize,
    georef: &Georeference,
    compression: Compression,
) -> GeoTiffResult<()> {
    check_input(data, width, height, georef)?;

    let mut encoder = TiffEncoder::new(writer)?.with_compression(compression.to_tiff());
    let mut image = encoder.new_image::<Gray32Float>(width as u32, height as u32)?;
    write_geotiff_tags(image.encoder(), georef)?;
    image.write_data(data)?;
    Ok(())
}

fn check_input(data: &[f32], width: usize, height: usize, georef: &Georeference) -> GeoTiffResult<()> {
    if width == 0 || height == 0 {
        return Err(GeoTiffError::InvalidData(
            "raster has zero dimensions".to_string(),
        ));
    }
    if data.len() != width * height {
        return Err(GeoTiffError::InvalidData(format!(
            "expected {} samples for {}x{}, got {}",
            width * height,
            width,
            height,
            data.len()
        )));
    }
    if !(georef.pixel_width > 0.0 && georef.pixel_height > 0.0) {
        return Err(GeoTiffError::InvalidData(format!(
            "pixel size must be positive, got {}x{}",
            georef.pixel_width, georef.pixel_height
        )));
    }
    if width > u32::MAX as usize || height > u32::MAX as usize {
        return Err(GeoTiffError::InvalidData(
            "dimensions exceed classic TIFF limits".to_string(),
        ));
    }
    Ok(())
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    georef: &Georeference,
) -> GeoTiffResult<()> {
    let pixel_scale = [georef.pixel_width, georef.pixel_height, 0.0];
    dir.write_tag(Tag::ModelPixelScaleTag, pixel_scale.as_slice())?;

    // Ties raster (0, 0) to the outer top-left corner
    let tiepoint = [0.0, 0.0, 0.0, georef.origin_x, georef.origin_y, 0.0];
    dir.write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())?;

    let (geokeys, citation) = build_geokey_directory(&georef.crs);
    dir.write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())?;
    dir.write_tag(Tag::GeoAsciiParamsTag, citation.as_str())?;

    dir.write_tag(gdal_nodata_tag(), "nan")?;
    Ok(())
}
