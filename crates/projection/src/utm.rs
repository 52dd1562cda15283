//! Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! This is the projection behind the Universal Transverse Mercator grid.
//! Each of the 60 UTM zones is a transverse Mercator with:
//! - Central meridian at the middle of a 6 degree zone
//! - Scale factor 0.9996 on the central meridian
//! - False easting of 500 000 m
//! - False northing of 0 m (north) or 10 000 000 m (south)
//!
//! Formulas follow the series expansions in Snyder, "Map Projections - A
//! Working Manual" (USGS PP 1395), pp. 61-64, which are accurate to well
//! below a millimetre inside a zone.

use geo_common::Hemisphere;
use num_traits::Float;
use std::f64::consts::PI;

/// WGS84 semi-major axis (meters)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 inverse flattening
pub const WGS84_INV_F: f64 = 298.257_223_563;
/// UTM central meridian scale factor
pub const UTM_K0: f64 = 0.9996;
/// UTM false easting (meters)
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// UTM false northing for the southern hemisphere (meters)
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (meters)
    pub false_easting: f64,
    /// False northing (meters)
    pub false_northing: f64,
    /// Semi-major axis (meters)
    pub a: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared
    ep2: f64,
    /// Meridian arc series coefficients
    m1: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    /// Footpoint latitude series coefficients
    e1: f64,
}

impl TransverseMercator {
    /// Create a transverse Mercator on the WGS84 ellipsoid.
    ///
    /// # Arguments
    /// * `lon0_deg` - Central meridian (degrees)
    /// * `k0` - Scale factor on the central meridian
    /// * `false_easting` - Added to x (meters)
    /// * `false_northing` - Added to y (meters)
    pub fn wgs84(lon0_deg: f64, k0: f64, false_easting: f64, false_northing: f64) -> Self {
        let a = WGS84_A;
        let f = 1.0 / WGS84_INV_F;
        let e2 = f * (2.0 - f);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let m1 = 1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0;
        let m2 = 3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0;
        let m3 = 15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0;
        let m4 = 35.0 * e6 / 3072.0;

        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

        Self {
            lon0: lon0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            a,
            e2,
            ep2,
            m1,
            m2,
            m3,
            m4,
            e1,
        }
    }

    /// Standard UTM projection for a zone (1-60) and hemisphere.
    pub fn utm(zone: u8, hemisphere: Hemisphere) -> Self {
        let false_northing = match hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => UTM_FALSE_NORTHING_SOUTH,
        };
        Self::wgs84(
            central_meridian(zone),
            UTM_K0,
            UTM_FALSE_EASTING,
            false_northing,
        )
    }

    /// Meridian arc length from the equator to latitude `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        self.a
            * (self.m1 * phi - self.m2 * (2.0 * phi).sin() + self.m3 * (4.0 * phi).sin()
                - self.m4 * (6.0 * phi).sin())
    }

    /// Convert geographic coordinates (degrees) to easting/northing (meters).
    ///
    /// Returns `(easting, northing)`.
    pub fn geo_to_xy(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let dlon = normalize_angle(lon_deg.to_radians() - self.lon0);

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon;
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0);

        let y = self.k0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Convert easting/northing (meters) to geographic coordinates.
    ///
    /// Returns `(lat, lon)` in degrees.
    pub fn xy_to_geo(&self, easting: f64, northing: f64) -> (f64, f64) {
        let x = easting - self.false_easting;
        let y = northing - self.false_northing;

        // Footpoint latitude
        let m = y / self.k0;
        let mu = m / (self.a * self.m1);
        let e1 = self.e1;
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = self.ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let denom = 1.0 - self.e2 * sin_phi1 * sin_phi1;
        let n1 = self.a / denom.sqrt();
        let r1 = self.a * (1.0 - self.e2) / denom.powf(1.5);
        let d = x / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d5
                    / 120.0)
                / cos_phi1;

        (phi.to_degrees(), normalize_angle(lambda).to_degrees())
    }

    /// Central meridian in degrees.
    pub fn central_meridian_deg(&self) -> f64 {
        self.lon0.to_degrees()
    }
}

/// Central meridian (degrees) of a UTM zone.
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Wrap an angle in radians into [-π, π].
fn normalize_angle<T: Float>(angle: T) -> T {
    let pi = T::from(PI).unwrap_or_else(T::zero);
    let two_pi = pi + pi;
    let mut a = angle;
    while a > pi {
        a = a - two_pi;
    }
    while a < -pi {
        a = a + two_pi;
    }
    a
}
