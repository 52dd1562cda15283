//! GeoKey directory construction and parsing.
//!
//! GeoKeyDirectory layout (GeoTIFF 1.0, section 2.4):
//! `[KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
//!   KeyID, TIFFTagLocation, Count, Value_Offset, ...]`

use geo_common::Crs;
use tiff::tags::Tag;

/// Location of ASCII-valued keys in the directory
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;
/// GDAL private tag carrying the nodata value as ASCII
pub const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey IDs
pub const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub const GT_CITATION_GEO_KEY: u16 = 1026;
pub const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub const GEOG_ANGULAR_UNITS_GEO_KEY: u16 = 2054;
pub const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
pub const PROJ_LINEAR_UNITS_GEO_KEY: u16 = 3076;

// GeoKey values
pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const ANGULAR_DEGREE: u16 = 9102;
pub const LINEAR_METER: u16 = 9001;

/// `GDAL_NODATA` as the `tiff` crate names it.
pub fn gdal_nodata_tag() -> Tag {
    Tag::from_u16_exhaustive(TAG_GDAL_NODATA)
}

/// Build the GeoKey directory and the matching GeoAsciiParams string.
pub fn build_geokey_directory(crs: &Crs) -> (Vec<u16>, String) {
    let citation = format!("{}|", crs.citation());
    let citation_len = citation.len() as u16;

    let mut entries: Vec<[u16; 4]> = vec![
        [
            GT_MODEL_TYPE_GEO_KEY,
            0,
            1,
            if crs.is_geographic() {
                MODEL_TYPE_GEOGRAPHIC
            } else {
                MODEL_TYPE_PROJECTED
            },
        ],
        [GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA],
        [GT_CITATION_GEO_KEY, TAG_GEO_ASCII_PARAMS, citation_len, 0],
    ];

    if crs.is_geographic() {
        entries.push([GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, crs.epsg()]);
        entries.push([GEOG_ANGULAR_UNITS_GEO_KEY, 0, 1, ANGULAR_DEGREE]);
    } else {
        entries.push([PROJECTED_CS_TYPE_GEO_KEY, 0, 1, crs.epsg()]);
        entries.push([PROJ_LINEAR_UNITS_GEO_KEY, 0, 1, LINEAR_METER]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    for entry in &entries {
        keys.extend_from_slice(entry);
    }
    (keys, citation)
}

/// Look up a short-valued key stored inline in the directory.
pub fn find_key(directory: &[u16], key_id: u16) -> Option<u16> {
    if directory.len() < 4 {
        return None;
    }
    let count = directory[3] as usize;
    directory[4..]
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key_id && entry[1] == 0)
        .map(|entry| entry[3])
}

/// Recover the CRS described by a GeoKey directory.
pub fn crs_from_directory(directory: &[u16]) -> Option<Crs> {
    match find_key(directory, GT_MODEL_TYPE_GEO_KEY)? {
        MODEL_TYPE_GEOGRAPHIC => {
            let code = find_key(directory, GEOGRAPHIC_TYPE_GEO_KEY)?;
            Crs::from_epsg(code as u32).ok()
        }
        MODEL_TYPE_PROJECTED => {
            let code = find_key(directory, PROJECTED_CS_TYPE_GEO_KEY)?;
            Crs::from_epsg(code as u32).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_common::Hemisphere;

    #[test]
    fn test_geographic_directory() {
        let (keys, ascii) = build_geokey_directory(&Crs::Geographic);
        assert_eq!(&keys[..4], &[1, 1, 0, 5]);
        assert_eq!(keys.len(), 4 + 5 * 4);
        assert_eq!(ascii, "WGS 84|");
        assert_eq!(find_key(&keys, GEOGRAPHIC_TYPE_GEO_KEY), Some(4326));
        assert_eq!(crs_from_directory(&keys), Some(Crs::Geographic));
    }

    #[test]
    fn test_utm_directory() {
        let crs = Crs::Utm {
            zone: 37,
            hemisphere: Hemisphere::North,
        };
        let (keys, ascii) = build_geokey_directory(&crs);
        assert_eq!(find_key(&keys, GT_MODEL_TYPE_GEO_KEY), Some(MODEL_TYPE_PROJECTED));
        assert_eq!(find_key(&keys, PROJECTED_CS_TYPE_GEO_KEY), Some(32637));
        assert_eq!(ascii, "WGS 84 / UTM zone 37N|");
        assert_eq!(crs_from_directory(&keys), Some(crs));
    }

    #[test]
    fn test_keys_sorted() {
        let (keys, _) = build_geokey_directory(&Crs::utm_for(-10.0, 20.0));
        let ids: Vec<u16> = keys[4..].chunks_exact(4).map(|e| e[0]).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_citation_points_at_ascii_params() {
        let (keys, ascii) = build_geokey_directory(&Crs::Geographic);
        let citation = keys[4..]
            .chunks_exact(4)
            .find(|e| e[0] == GT_CITATION_GEO_KEY)
            .unwrap();
        assert_eq!(citation[1], Tag::GeoAsciiParamsTag.to_u16());
        assert_eq!(citation[2] as usize, ascii.len());
    }
}
