// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tiles-Lite Geometry
//!
//! Bounding volumes, coordinate reference systems and transform helpers for
//! 3D Tiles, built on nalgebra.

pub mod aabb;
pub mod bounding_volume;
pub mod crs;
pub mod cube;
pub mod error;
pub mod matrix;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};

pub use aabb::{z_up_to_y_up, Aabb};
pub use bounding_volume::{BoundingVolume, GeoRegion};
pub use crs::{CoordinateTransform, Crs};
pub use cube::Cube;
pub use error::{Error, Result};
pub use matrix::{matrix_from_wire, matrix_to_wire};
