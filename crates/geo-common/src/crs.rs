//! Coordinate reference systems supported for output rasters.
//!
//! Only two families are supported: WGS84 geographic coordinates and
//! WGS84 / UTM with an explicit zone and hemisphere.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Hemisphere for a latitude. The equator belongs to the north.
    pub fn from_latitude(lat: f64) -> Self {
        if lat < 0.0 {
            Hemisphere::South
        } else {
            Hemisphere::North
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        }
    }
}

/// Output coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// WGS84 geographic (lon/lat in degrees), EPSG:4326
    Geographic,
    /// WGS84 / UTM, EPSG:326zz (north) or EPSG:327zz (south)
    Utm { zone: u8, hemisphere: Hemisphere },
}

/// UTM zone containing a longitude.
///
/// Zone = floor((lon + 180) / 6) + 1. Longitudes on a zone boundary belong
/// to the eastern zone; lon = 180 folds into zone 60.
pub fn utm_zone_for_longitude(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() as i64 + 1;
    zone.clamp(1, 60) as u8
}

impl Crs {
    /// UTM zone and hemisphere for a geographic location.
    pub fn utm_for(lat: f64, lon: f64) -> Self {
        Crs::Utm {
            zone: utm_zone_for_longitude(lon),
            hemisphere: Hemisphere::from_latitude(lat),
        }
    }

    /// Build a UTM CRS, validating the zone number.
    pub fn utm(zone: u8, hemisphere: Hemisphere) -> Result<Self, CrsParseError> {
        if !(1..=60).contains(&zone) {
            return Err(CrsParseError::InvalidZone(zone));
        }
        Ok(Crs::Utm { zone, hemisphere })
    }

    /// Parse an EPSG code (4326, 32601-32660, 32701-32760).
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        match code {
            4326 => Ok(Crs::Geographic),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
                hemisphere: Hemisphere::North,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: (code - 32700) as u8,
                hemisphere: Hemisphere::South,
            }),
            _ => Err(CrsParseError::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Parse strings like "EPSG:4326" or "epsg:32637".
    pub fn from_epsg_string(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();
        let code = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;
        Self::from_epsg(code)
    }

    /// EPSG code for this CRS.
    pub fn epsg(&self) -> u16 {
        match self {
            Crs::Geographic => 4326,
            Crs::Utm {
                zone,
                hemisphere: Hemisphere::North,
            } => 32600 + *zone as u16,
            Crs::Utm {
                zone,
                hemisphere: Hemisphere::South,
            } => 32700 + *zone as u16,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }

    /// Short zone label such as "37N"; `None` for geographic.
    pub fn zone_label(&self) -> Option<String> {
        match self {
            Crs::Geographic => None,
            Crs::Utm { zone, hemisphere } => Some(format!("{}{}", zone, hemisphere.letter())),
        }
    }

    /// Human-readable citation used in file metadata.
    pub fn citation(&self) -> String {
        match self {
            Crs::Geographic => "WGS 84".to_string(),
            Crs::Utm { zone, hemisphere } => {
                format!("WGS 84 / UTM zone {}{}", zone, hemisphere.letter())
            }
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid UTM zone: {0} (expected 1-60)")]
    InvalidZone(u8),
}
