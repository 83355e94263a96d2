// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes.

use nalgebra::Point3;

/// Axis-aligned bounding box in some (implicit) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two opposite corners, in any order.
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Point containment, inclusive, with `tolerance` slack on every face.
    pub fn contains(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        p.x >= self.min.x - tolerance
            && p.x <= self.max.x + tolerance
            && p.y >= self.min.y - tolerance
            && p.y <= self.max.y + tolerance
            && p.z >= self.min.z - tolerance
            && p.z <= self.max.z + tolerance
    }
}

/// Map a Z-up point into a Y-up frame: `(x, y, z) -> (x, z, -y)`.
#[inline]
pub fn z_up_to_y_up(p: &Point3<f64>) -> Point3<f64> {
    Point3::new(p.x, p.z, -p.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_expand() {
        let mut bb = Aabb::new(Point3::new(1.0, -2.0, 3.0), Point3::new(1.0, -2.0, 3.0));
        bb.expand(&Point3::new(-1.0, 5.0, 0.5));
        bb.expand(&Point3::new(0.0, 0.0, 4.0));
        assert_eq!(bb.min, Point3::new(-1.0, -2.0, 0.5));
        assert_eq!(bb.max, Point3::new(1.0, 5.0, 4.0));
        assert_relative_eq!(bb.center().y, 1.5);
    }

    #[test]
    fn test_contains_with_tolerance() {
        let bb = Aabb::new(Point3::new(10.0, 10.0, 10.0), Point3::origin());
        assert!(bb.contains(&Point3::new(10.0, 0.0, 5.0), 0.0));
        assert!(!bb.contains(&Point3::new(10.0005, 0.0, 5.0), 0.0));
        assert!(bb.contains(&Point3::new(10.0005, 0.0, 5.0), 0.001));
    }

    #[test]
    fn test_y_up_flip() {
        let p = z_up_to_y_up(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3::new(1.0, 3.0, -2.0));
    }
}
