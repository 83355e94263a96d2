// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding volumes of 3D Tiles.
//!
//! Three shapes are supported:
//!
//! - **Box**: centre plus three half-axis vectors, in ECEF (EPSG:4978)
//! - **Sphere**: centre plus radius, in ECEF (EPSG:4978)
//! - **Region**: geographic extent in radians with a height range
//!   (EPSG:4979)
//!
//! Box and sphere volumes live in the tile's local frame and are moved into
//! world space by the tile's combined transform. A region is already in
//! world coordinates and ignores the tile transform; it is only reprojected.

use crate::aabb::Aabb;
use crate::crs::{CoordinateTransform, Crs};
use crate::cube::Cube;
use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Geographic extent of a `region` volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRegion {
    /// Radians
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    /// Metres above the WGS84 ellipsoid
    pub min_height: f64,
    pub max_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    Box {
        center: Point3<f64>,
        half_axes: [Vector3<f64>; 3],
    },
    Sphere {
        center: Point3<f64>,
        radius: f64,
    },
    Region(GeoRegion),
}

fn check_finite(values: &[f64], what: &'static str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonFinite(what))
    }
}

impl BoundingVolume {
    /// Build a box from its 12 wire numbers: centre, then x, y and z half axes.
    pub fn from_box(values: &[f64]) -> Result<Self> {
        if values.len() != 12 {
            return Err(Error::InvalidVolume(format!(
                "box needs 12 numbers, got {}",
                values.len()
            )));
        }
        check_finite(values, "box")?;
        let v = |i: usize| Vector3::new(values[i], values[i + 1], values[i + 2]);
        Ok(BoundingVolume::Box {
            center: Point3::from(v(0)),
            half_axes: [v(3), v(6), v(9)],
        })
    }

    /// Build a sphere from its 4 wire numbers: centre then radius.
    pub fn from_sphere(values: &[f64]) -> Result<Self> {
        if values.len() != 4 {
            return Err(Error::InvalidVolume(format!(
                "sphere needs 4 numbers, got {}",
                values.len()
            )));
        }
        check_finite(values, "sphere")?;
        if values[3] < 0.0 {
            return Err(Error::InvalidVolume(format!(
                "negative sphere radius {}",
                values[3]
            )));
        }
        Ok(BoundingVolume::Sphere {
            center: Point3::new(values[0], values[1], values[2]),
            radius: values[3],
        })
    }

    /// Build a region from its 6 wire numbers:
    /// west, south, east, north, minimum height, maximum height.
    pub fn from_region(values: &[f64]) -> Result<Self> {
        if values.len() != 6 {
            return Err(Error::InvalidVolume(format!(
                "region needs 6 numbers, got {}",
                values.len()
            )));
        }
        check_finite(values, "region")?;
        Ok(BoundingVolume::Region(GeoRegion {
            west: values[0],
            south: values[1],
            east: values[2],
            north: values[3],
            min_height: values[4],
            max_height: values[5],
        }))
    }

    /// CRS the volume's numbers are expressed in.
    pub fn native_crs(&self) -> Crs {
        match self {
            BoundingVolume::Box { .. } | BoundingVolume::Sphere { .. } => Crs::Ecef,
            BoundingVolume::Region(_) => Crs::Geographic,
        }
    }

    /// Eight corners of the volume after applying `transform` (box and
    /// sphere only) and reprojecting into the target CRS of `crs`.
    pub fn as_cube(&self, transform: &Matrix4<f64>, crs: Option<&CoordinateTransform>) -> Cube {
        let cube = match self {
            BoundingVolume::Box { center, half_axes } => {
                let [u, v, w] = half_axes;
                let frame = Matrix4::from_columns(&[
                    u.push(0.0),
                    v.push(0.0),
                    w.push(0.0),
                    Vector4::new(center.x, center.y, center.z, 1.0),
                ]);
                Cube::from_unit_transform(&(transform * frame))
            }
            BoundingVolume::Sphere { center, radius } => {
                let r = Vector3::repeat(*radius);
                Cube::from_extent(center - r, center + r).transformed(transform)
            }
            BoundingVolume::Region(region) => Cube::from_extent(
                Point3::new(region.west, region.south, region.min_height),
                Point3::new(region.east, region.north, region.max_height),
            ),
        };
        cube.reprojected(self.native_crs(), crs)
    }

    /// Axis-aligned box around [`Self::as_cube`]. With `flip_y` the corners
    /// are first moved from a Z-up to a Y-up frame.
    pub fn as_aabb(
        &self,
        transform: &Matrix4<f64>,
        crs: Option<&CoordinateTransform>,
        flip_y: bool,
    ) -> Aabb {
        let cube = self.as_cube(transform, crs);
        if flip_y {
            cube.y_up().aabb()
        } else {
            cube.aabb()
        }
    }

    /// Line strip over the cube's edges, for debug rendering.
    pub fn as_outline(
        &self,
        transform: &Matrix4<f64>,
        crs: Option<&CoordinateTransform>,
    ) -> Vec<Point3<f64>> {
        self.as_cube(transform, crs).outline()
    }

    pub fn center(&self, transform: &Matrix4<f64>, crs: Option<&CoordinateTransform>) -> Point3<f64> {
        self.as_aabb(transform, crs, false).center()
    }

    /// Whether `p` (same frame as the volume's AABB) lies inside the volume's
    /// axis-aligned bounds.
    pub fn contains_point(
        &self,
        p: &Point3<f64>,
        transform: &Matrix4<f64>,
        crs: Option<&CoordinateTransform>,
    ) -> bool {
        self.as_aabb(transform, crs, false).contains(p, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wire_arity() {
        assert!(BoundingVolume::from_box(&[0.0; 12]).is_ok());
        assert!(BoundingVolume::from_box(&[0.0; 11]).is_err());
        assert!(BoundingVolume::from_sphere(&[0.0, 0.0, 0.0, 1.0]).is_ok());
        assert!(BoundingVolume::from_sphere(&[0.0, 0.0, 0.0, -1.0]).is_err());
        assert!(BoundingVolume::from_region(&[0.0; 5]).is_err());
        assert!(BoundingVolume::from_region(&[0.0, 0.0, 0.0, f64::NAN, 0.0, 1.0]).is_err());
    }

    #[test]
    fn test_native_crs() {
        let b = BoundingVolume::from_box(&[0.0; 12]).unwrap();
        let s = BoundingVolume::from_sphere(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        let r = BoundingVolume::from_region(&[0.0; 6]).unwrap();
        assert_eq!(b.native_crs(), Crs::Ecef);
        assert_eq!(s.native_crs(), Crs::Ecef);
        assert_eq!(r.native_crs(), Crs::Geographic);
    }

    #[test]
    fn test_box_cube_with_translation() {
        let bv = BoundingVolume::from_box(&[
            1.0, 2.0, 3.0, //
            2.0, 0.0, 0.0, //
            0.0, 3.0, 0.0, //
            0.0, 0.0, 4.0,
        ])
        .unwrap();
        let t = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let cube = bv.as_cube(&t, None);
        assert_eq!(cube.ll(), Point3::new(9.0, -1.0, -1.0));
        assert_eq!(cube.ur(), Point3::new(13.0, 5.0, 7.0));
        let c = bv.center(&t, None);
        assert_relative_eq!(c.x, 11.0);
        assert_relative_eq!(c.y, 2.0);
        assert_relative_eq!(c.z, 3.0);
    }

    #[test]
    fn test_sphere_cube() {
        let bv = BoundingVolume::from_sphere(&[1.0, 1.0, 1.0, 2.0]).unwrap();
        let bb = bv.as_aabb(&Matrix4::identity(), None, false);
        assert_eq!(bb.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(bb.max, Point3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_region_ignores_transform() {
        let bv = BoundingVolume::from_region(&[-1.3, 0.6, -1.2, 0.7, 0.0, 100.0]).unwrap();
        let rotation = Matrix4::from_euler_angles(0.3, 0.2, 1.1)
            * Matrix4::new_translation(&Vector3::new(100.0, 0.0, 0.0));
        let a = bv.as_cube(&Matrix4::identity(), None);
        let b = bv.as_cube(&rotation, None);
        assert_eq!(a, b);
        assert_eq!(a.ll(), Point3::new(-1.3, 0.6, 0.0));
        assert_eq!(a.ur(), Point3::new(-1.2, 0.7, 100.0));
    }

    #[test]
    fn test_flip_y_aabb() {
        let bv = BoundingVolume::from_box(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, //
            0.0, 0.0, 3.0,
        ])
        .unwrap();
        let bb = bv.as_aabb(&Matrix4::identity(), None, true);
        assert_eq!(bb.min, Point3::new(-1.0, -3.0, -2.0));
        assert_eq!(bb.max, Point3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_contains_point() {
        let bv = BoundingVolume::from_sphere(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        assert!(bv.contains_point(&Point3::new(0.5, 0.5, 0.5), &Matrix4::identity(), None));
        assert!(!bv.contains_point(&Point3::new(1.5, 0.0, 0.0), &Matrix4::identity(), None));
    }
}
