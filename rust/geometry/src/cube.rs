// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Eight-corner hexahedron produced from any bounding volume.
//!
//! Corner order is fixed so that consumers can index corners directly:
//!
//! ```text
//!        7 ---------- 6
//!       /|           /|
//!      4 ---------- 5 |
//!      | |          | |
//!      | 3 ---------|-2
//!      |/           |/
//!      0 ---------- 1
//! ```
//!
//! Corner 0 is the lower-left-near corner (`ll`), corner 6 the
//! upper-right-far corner (`ur`).

use crate::aabb::{z_up_to_y_up, Aabb};
use crate::crs::{CoordinateTransform, Crs};
use nalgebra::{Matrix4, Point3};

/// Sign pattern of each corner relative to the cube's centre.
const CORNER_SIGNS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Line strip that visits every edge of the cube at least once.
const OUTLINE_STRIP: [usize; 16] = [0, 1, 2, 3, 0, 4, 5, 1, 5, 6, 2, 6, 7, 3, 7, 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    corners: [Point3<f64>; 8],
}

impl Cube {
    pub fn from_corners(corners: [Point3<f64>; 8]) -> Self {
        Self { corners }
    }

    /// Axis-aligned cube spanning `ll` to `ur`.
    pub fn from_extent(ll: Point3<f64>, ur: Point3<f64>) -> Self {
        let pick = |s: f64, lo: f64, hi: f64| if s < 0.0 { lo } else { hi };
        let corners = CORNER_SIGNS.map(|[sx, sy, sz]| {
            Point3::new(pick(sx, ll.x, ur.x), pick(sy, ll.y, ur.y), pick(sz, ll.z, ur.z))
        });
        Self { corners }
    }

    /// The unit cube `[-1, 1]^3` mapped through `m`.
    pub fn from_unit_transform(m: &Matrix4<f64>) -> Self {
        let corners =
            CORNER_SIGNS.map(|[x, y, z]| m.transform_point(&Point3::new(x, y, z)));
        Self { corners }
    }

    pub fn corners(&self) -> &[Point3<f64>; 8] {
        &self.corners
    }

    pub fn ll(&self) -> Point3<f64> {
        self.corners[0]
    }

    pub fn ur(&self) -> Point3<f64> {
        self.corners[6]
    }

    pub fn transformed(&self, m: &Matrix4<f64>) -> Self {
        Self {
            corners: self.corners.map(|p| m.transform_point(&p)),
        }
    }

    /// Reproject every corner from `native` into the transform's target.
    /// Without a transform the cube is returned unchanged.
    pub fn reprojected(&self, native: Crs, transform: Option<&CoordinateTransform>) -> Self {
        match transform {
            Some(t) => Self {
                corners: self.corners.map(|p| t.transform_from(native, &p)),
            },
            None => *self,
        }
    }

    /// Re-express the corners in a Y-up frame.
    pub fn y_up(&self) -> Self {
        Self {
            corners: self.corners.map(|p| z_up_to_y_up(&p)),
        }
    }

    pub fn aabb(&self) -> Aabb {
        let mut bb = Aabb {
            min: self.corners[0],
            max: self.corners[0],
        };
        for p in &self.corners[1..] {
            bb.expand(p);
        }
        bb
    }

    /// Sixteen points forming a line strip over all twelve edges.
    pub fn outline(&self) -> Vec<Point3<f64>> {
        OUTLINE_STRIP.iter().map(|&i| self.corners[i]).collect()
    }
}
