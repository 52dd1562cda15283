//! Geographic to output-axis transformation for a [`Crs`].

use geo_common::{BoundingBox, Crs};

use crate::utm::TransverseMercator;

/// Maps WGS84 lat/lon into the planar axes of an output CRS.
///
/// For [`Crs::Geographic`] the axes are (lon, lat) in degrees; for
/// [`Crs::Utm`] they are (easting, northing) in meters.
#[derive(Debug, Clone)]
pub struct Projector {
    crs: Crs,
    tm: Option<TransverseMercator>,
}

impl Projector {
    pub fn new(crs: Crs) -> Self {
        let tm = match crs {
            Crs::Geographic => None,
            Crs::Utm { zone, hemisphere } => Some(TransverseMercator::utm(zone, hemisphere)),
        };
        Self { crs, tm }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Project a geographic coordinate to output axes `(x, y)`.
    #[inline]
    pub fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        match &self.tm {
            None => (lon, lat),
            Some(tm) => tm.geo_to_xy(lat, lon),
        }
    }

    /// Convert output axes `(x, y)` back to `(lat, lon)`.
    #[inline]
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.tm {
            None => (y, x),
            Some(tm) => tm.xy_to_geo(x, y),
        }
    }

    /// Geographic bounds `(min_lon, min_lat, max_lon, max_lat)` of a box in
    /// output axes, found by sampling its edges.
    pub fn geographic_bounds(&self, bbox: &BoundingBox) -> BoundingBox {
        let mut out = BoundingBox::empty();
        for t in 0..=10 {
            let frac = t as f64 / 10.0;
            let x = bbox.min_x + frac * bbox.width();
            let y = bbox.min_y + frac * bbox.height();
            for (px, py) in [(x, bbox.min_y), (x, bbox.max_y), (bbox.min_x, y), (bbox.max_x, y)] {
                let (lat, lon) = self.inverse(px, py);
                out.include(lon, lat);
            }
        }
        out
    }
}
