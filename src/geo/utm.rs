//! Universal Transverse Mercator projection on the WGS84 ellipsoid
//!
//! Forward projection only, using the Snyder series (USGS PP 1395, eq. 8-9
//! to 8-10). Accurate to well under a metre inside a zone.

use serde::Serialize;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone and hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    /// Zone containing the given position
    pub fn for_point(lon: f64, lat: f64) -> Self {
        let number = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u8;
        Self {
            number,
            north: lat >= 0.0,
        }
    }

    /// EPSG code of the WGS84 / UTM CRS for this zone (326zz north, 327zz south)
    pub fn epsg(&self) -> u32 {
        let base = if self.north { 32600 } else { 32700 };
        base + self.number as u32
    }

    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    /// Project `(lon, lat)` degrees to `(easting, northing)` metres
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let dlam = (lon - self.central_meridian()).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlam;

        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

        let easting = K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;

        let mut northing = K0
            * (m + n
                * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

        if !self.north {
            northing += FALSE_NORTHING_SOUTH;
        }

        (easting, northing)
    }
}
