//! Read back metadata and samples from single-band Float32 GeoTIFFs.

use geo_common::Crs;
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::geokeys::{crs_from_directory, gdal_nodata_tag};

/// TIFF compression codes.
pub const COMPRESSION_NONE: u16 = 1;
pub const COMPRESSION_DEFLATE: u16 = 8;

/// Georeferencing and layout metadata of a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffInfo {
    pub width: usize,
    pub height: usize,
    pub compression: u16,
    /// `[ScaleX, ScaleY, ScaleZ]`
    pub pixel_scale: [f64; 3],
    /// `[I, J, K, X, Y, Z]`
    pub tiepoint: [f64; 6],
    pub crs: Option<Crs>,
    pub citation: Option<String>,
    pub nodata: Option<String>,
}

impl GeoTiffInfo {
    /// Map coordinates of the outer top-left corner.
    pub fn origin(&self) -> (f64, f64) {
        (self.tiepoint[3], self.tiepoint[4])
    }

    /// Map coordinates of the outer bottom-right corner.
    pub fn far_corner(&self) -> (f64, f64) {
        (
            self.tiepoint[3] + self.width as f64 * self.pixel_scale[0],
            self.tiepoint[4] - self.height as f64 * self.pixel_scale[1],
        )
    }
}

/// Parse a GeoTIFF into its metadata and Float32 samples.
pub fn decode_geotiff(tiff: &[u8]) -> GeoTiffResult<(GeoTiffInfo, Vec<f32>)> {
    let mut decoder = Decoder::new(Cursor::new(tiff))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let compression = match decoder.find_tag(Tag::Compression)? {
        Some(value) => value.into_u32()? as u16,
        None => COMPRESSION_NONE,
    };

    let pixel_scale = fixed_doubles::<3>(&mut decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = fixed_doubles::<6>(&mut decoder, Tag::ModelTiepointTag)?;

    let crs = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(value) => {
            let keys: Vec<u16> = value
                .into_u64_vec()?
                .into_iter()
                .filter_map(|k| u16::try_from(k).ok())
                .collect();
            crs_from_directory(&keys)
        }
        None => None,
    };
    let citation = ascii(&mut decoder, Tag::GeoAsciiParamsTag)?
        .map(|s| s.trim_end_matches('|').to_string());
    let nodata = ascii(&mut decoder, gdal_nodata_tag())?;

    let samples = match decoder.read_image()? {
        DecodingResult::F32(samples) => samples,
        _ => {
            return Err(GeoTiffError::Unsupported(format!(
                "expected Float32 samples, found {:?}",
                decoder.colortype()?
            )))
        }
    };

    let info = GeoTiffInfo {
        width: width as usize,
        height: height as usize,
        compression,
        pixel_scale,
        tiepoint,
        crs,
        citation,
        nodata,
    };
    Ok((info, samples))
}

fn fixed_doubles<const N: usize>(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    tag: Tag,
) -> GeoTiffResult<[f64; N]> {
    let values = decoder.get_tag_f64_vec(tag)?;
    if values.len() < N {
        return Err(GeoTiffError::Unsupported(format!(
            "{:?} must hold {} doubles, found {}",
            tag,
            N,
            values.len()
        )));
    }
    let mut out = [0.0; N];
    out.copy_from_slice(&values[..N]);
    Ok(out)
}

fn ascii(decoder: &mut Decoder<Cursor<&[u8]>>, tag: Tag) -> GeoTiffResult<Option<String>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_string()?.trim_end_matches('\0').to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            decode_geotiff(b"GIF89a"),
            Err(GeoTiffError::Tiff(_))
        ));
    }
}
