// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate reference systems used by 3D Tiles data.
//!
//! Tile content is authored in one of two native frames: Earth-centred,
//! Earth-fixed cartesian coordinates (EPSG:4978) for `box` and `sphere`
//! volumes, and WGS84 geographic coordinates (EPSG:4979, radians and metres)
//! for `region` volumes. Renderers usually want a projected map frame, so
//! Web Mercator (EPSG:3857) is provided as a destination.
//!
//! Every conversion goes through ECEF, which keeps the set of formulas
//! small: each [`Crs`] only knows how to get to and from ECEF.

use nalgebra::Point3;
use std::f64::consts::FRAC_PI_4;

/// WGS84 semi-major axis in metres
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Latitude limit of the Web Mercator projection (radians)
pub const MERCATOR_MAX_LAT: f64 = 1.484_422_229_745_332_4;

/// A coordinate reference system understood by the tile engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Earth-centred, Earth-fixed cartesian (EPSG:4978)
    Ecef,
    /// WGS84 longitude/latitude in radians, ellipsoidal height in metres (EPSG:4979)
    Geographic,
    /// Spherical Web Mercator, height passed through (EPSG:3857)
    WebMercator,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Ecef => 4978,
            Crs::Geographic => 4979,
            Crs::WebMercator => 3857,
        }
    }

    /// Look up a CRS by EPSG code.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4978 => Some(Crs::Ecef),
            4979 => Some(Crs::Geographic),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    /// Parse an authority identifier such as `"EPSG:3857"`.
    pub fn from_authid(authid: &str) -> Option<Self> {
        let (authority, code) = authid.split_once(':')?;
        if !authority.trim().eq_ignore_ascii_case("epsg") {
            return None;
        }
        code.trim().parse().ok().and_then(Self::from_epsg)
    }

    /// Convert a point expressed in this CRS to ECEF.
    pub fn to_ecef(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            Crs::Ecef => *p,
            Crs::Geographic => geodetic_to_ecef(p.x, p.y, p.z),
            Crs::WebMercator => {
                let lon = p.x / WGS84_A;
                let lat = 2.0 * (p.y / WGS84_A).exp().atan() - 2.0 * FRAC_PI_4;
                geodetic_to_ecef(lon, lat, p.z)
            }
        }
    }

    /// Convert an ECEF point into this CRS.
    pub fn from_ecef(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            Crs::Ecef => *p,
            Crs::Geographic => ecef_to_geodetic(p),
            Crs::WebMercator => {
                let g = ecef_to_geodetic(p);
                let lat = g.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
                Point3::new(
                    WGS84_A * g.x,
                    WGS84_A * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                    g.z,
                )
            }
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Geodetic (lon, lat radians, height metres) to ECEF on the WGS84 ellipsoid.
pub fn geodetic_to_ecef(lon: f64, lat: f64, height: f64) -> Point3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    Point3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height) * sin_lat,
    )
}

/// ECEF to geodetic (lon, lat radians, height metres).
///
/// Fixed-point iteration on latitude; each step shrinks the error by about
/// a factor of e², so a handful of steps reaches double precision.
pub fn ecef_to_geodetic(p: &Point3<f64>) -> Point3<f64> {
    let lon = p.y.atan2(p.x);
    let r = (p.x * p.x + p.y * p.y).sqrt();
    let mut lat = p.z.atan2(r * (1.0 - WGS84_E2));
    let mut n = WGS84_A;
    for _ in 0..6 {
        let sin_lat = lat.sin();
        n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        lat = (p.z + WGS84_E2 * n * sin_lat).atan2(r);
    }
    let (sin_lat, cos_lat) = lat.sin_cos();
    let height = r * cos_lat + (p.z + WGS84_E2 * n * sin_lat) * sin_lat - n;
    Point3::new(lon, lat, height)
}

/// Reprojection from one CRS into another.
///
/// Bounding volumes know their own native CRS, so the source stored here
/// only matters when points are transformed directly with
/// [`CoordinateTransform::transform_point`]. Volumes call
/// [`CoordinateTransform::transform_from`] with their native CRS instead,
/// which bridges through ECEF when it differs from `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateTransform {
    source: Crs,
    target: Crs,
}

impl CoordinateTransform {
    pub fn new(source: Crs, target: Crs) -> Self {
        Self { source, target }
    }

    /// Build a transform from authority ids. Unknown ids yield `None`;
    /// callers treat that as "no reprojection".
    pub fn from_authids(source: &str, target: &str) -> Option<Self> {
        match (Crs::from_authid(source), Crs::from_authid(target)) {
            (Some(s), Some(t)) => Some(Self::new(s, t)),
            _ => {
                tracing::warn!(source, target, "Unsupported CRS pair, reprojection disabled");
                None
            }
        }
    }

    pub fn source(&self) -> Crs {
        self.source
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.transform_from(self.source, p)
    }

    /// Reproject a point given in `native` into this transform's target.
    pub fn transform_from(&self, native: Crs, p: &Point3<f64>) -> Point3<f64> {
        if native == self.target {
            return *p;
        }
        self.target.from_ecef(&native.to_ecef(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_authid_parsing() {
        assert_eq!(Crs::from_authid("EPSG:4978"), Some(Crs::Ecef));
        assert_eq!(Crs::from_authid("epsg: 3857"), Some(Crs::WebMercator));
        assert_eq!(Crs::from_authid("EPSG:2056"), None);
        assert_eq!(Crs::from_authid("4326"), None);
        assert_eq!(Crs::Geographic.to_string(), "EPSG:4979");
    }

    #[test]
    fn test_geodetic_ecef_roundtrip() {
        let lon = (-75.6_f64).to_radians();
        let lat = 40.05_f64.to_radians();
        let ecef = geodetic_to_ecef(lon, lat, 120.0);
        let back = ecef_to_geodetic(&ecef);
        assert_relative_eq!(back.x, lon, epsilon = 1e-12);
        assert_relative_eq!(back.y, lat, epsilon = 1e-12);
        assert_relative_eq!(back.z, 120.0, epsilon = 1e-6);
    }

    #[test]
    fn test_equator_prime_meridian() {
        let p = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert_relative_eq!(p.x, WGS84_A, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);

        let merc = Crs::WebMercator.from_ecef(&p);
        assert_relative_eq!(merc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(merc.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mercator_clamps_poles() {
        let pole = geodetic_to_ecef(0.0, std::f64::consts::FRAC_PI_2, 0.0);
        let merc = Crs::WebMercator.from_ecef(&pole);
        assert!(merc.y.is_finite());
        assert_relative_eq!(merc.y, 20_037_508.342789244, epsilon = 1.0);
    }

    #[test]
    fn test_transform_bridges_native_crs() {
        let t = CoordinateTransform::new(Crs::Ecef, Crs::WebMercator);
        let geo = Point3::new(0.1, 0.2, 50.0);
        let via_geo = t.transform_from(Crs::Geographic, &geo);
        let via_ecef = t.transform_point(&geodetic_to_ecef(0.1, 0.2, 50.0));
        assert_relative_eq!(via_geo.x, via_ecef.x, epsilon = 1e-6);
        assert_relative_eq!(via_geo.y, via_ecef.y, epsilon = 1e-6);
        assert_relative_eq!(via_geo.z, via_ecef.z, epsilon = 1e-6);

        let same = CoordinateTransform::new(Crs::Ecef, Crs::Ecef);
        assert!(same.is_identity());
        assert_eq!(same.transform_point(&geo), geo);
    }

    #[test]
    fn test_unknown_authids() {
        assert!(CoordinateTransform::from_authids("EPSG:4978", "EPSG:31370").is_none());
        let t = CoordinateTransform::from_authids("EPSG:4978", "EPSG:3857").unwrap();
        assert_eq!(t.target(), Crs::WebMercator);
    }
}
