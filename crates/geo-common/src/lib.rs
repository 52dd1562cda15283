//! Common geographic types shared across the msuproj workspace.

pub mod bbox;
pub mod crs;
pub mod point;

pub use bbox::BoundingBox;
pub use crs::{utm_zone_for_longitude, Crs, CrsParseError, Hemisphere};
pub use point::GeoPoint;
