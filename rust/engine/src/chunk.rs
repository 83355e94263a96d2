// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunk ids: spatial addresses of tiles.
//!
//! A tile is addressed by its level and the offset of its bounding-box
//! center from the root bounding-box center, in millimetres. Lookup walks
//! down from the root, only entering tiles whose box holds the target.

use crate::error::Result;
use crate::tile::{Content, Tile};
use crate::tileset::Tileset;
use nalgebra::{Point3, Vector3};
use tiles_lite_geometry::{Aabb, CoordinateTransform};

/// Ids are integer millimetres.
const ID_SCALE: f64 = 1000.0;

/// Slack when testing whether a tile box holds a decoded center.
const CONTAINMENT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkNodeId {
    pub level: u32,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ChunkNodeId {
    pub const ROOT: ChunkNodeId = ChunkNodeId::new(0, 0, 0, 0);

    pub const fn new(level: u32, x: i64, y: i64, z: i64) -> Self {
        Self { level, x, y, z }
    }
}

impl std::fmt::Display for ChunkNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.level, self.x, self.y, self.z)
    }
}

fn quantize(v: f64) -> i64 {
    (v * ID_SCALE).round() as i64
}

impl<'a> Tileset<'a> {
    /// Center of the root bounding box, in the frame of `crs`.
    pub fn root_center(&self, crs: Option<&CoordinateTransform>) -> Point3<f64> {
        if self.is_top_level() {
            self.tree().root_bb(crs).center()
        } else {
            self.root().aabb(crs).center()
        }
    }

    pub fn encode_tile_id(&self, level: u32, bbox: &Aabb, crs: Option<&CoordinateTransform>) -> ChunkNodeId {
        let offset = bbox.center() - self.root_center(crs);
        ChunkNodeId::new(level, quantize(offset.x), quantize(offset.y), quantize(offset.z))
    }

    /// Chunk id of `tile`, at the tile's own depth.
    pub fn tile_id(&self, tile: &Tile<'_>, crs: Option<&CoordinateTransform>) -> ChunkNodeId {
        self.encode_tile_id(tile.depth(), &tile.aabb(crs), crs)
    }

    /// World-space center designated by `id`.
    pub fn decode_tile_id(&self, id: &ChunkNodeId, crs: Option<&CoordinateTransform>) -> Point3<f64> {
        let offset = Vector3::new(id.x as f64, id.y as f64, id.z as f64) / ID_SCALE;
        self.root_center(crs) + offset
    }

    /// Find the tile addressed by `id`.
    ///
    /// An exact id match wins; otherwise the tile at `id.level` whose center
    /// is nearest to the decoded target, the first in depth-first document
    /// order on ties. Expands children and nested tilesets on the way.
    pub fn find_tile(&self, id: &ChunkNodeId, crs: Option<&CoordinateTransform>) -> Result<Option<Tile<'a>>> {
        let root = self.root();
        if id.level == 0 {
            return Ok(Some(root));
        }
        let root_center = self.root_center(crs);
        let target = root_center + Vector3::new(id.x as f64, id.y as f64, id.z as f64) / ID_SCALE;

        let mut nearest: Option<(f64, Tile<'a>)> = None;
        let mut stack = vec![root];
        while let Some(tile) = stack.pop() {
            if tile.depth() >= id.level {
                continue;
            }
            let mut candidates = tile.children()?;
            if candidates.is_empty() {
                if let Content::Tileset(nested) = tile.content()? {
                    candidates.push(nested.root());
                }
            }

            let mut descend = Vec::new();
            for candidate in candidates {
                let bbox = candidate.aabb(crs);
                if !bbox.contains(&target, CONTAINMENT_TOLERANCE) {
                    continue;
                }
                if candidate.depth() == id.level {
                    let center = bbox.center();
                    let offset = center - root_center;
                    let encoded = ChunkNodeId::new(
                        id.level,
                        quantize(offset.x),
                        quantize(offset.y),
                        quantize(offset.z),
                    );
                    if encoded == *id {
                        return Ok(Some(candidate));
                    }
                    let distance = (center - target).norm();
                    if nearest.as_ref().map_or(true, |(best, _)| distance < *best) {
                        nearest = Some((distance, candidate));
                    }
                } else {
                    descend.push(candidate);
                }
            }
            // Reverse so the first child is popped first.
            stack.extend(descend.into_iter().rev());
        }

        if nearest.is_none() {
            tracing::debug!(%id, "No tile for chunk id");
        }
        Ok(nearest.map(|(_, tile)| tile))
    }
}
