// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Renderer query interface.
//!
//! A renderer walks the hierarchy through chunk ids only: it asks for the
//! root node, then for the children of nodes it decides to refine, and
//! loads the content of the nodes it draws.

use crate::chunk::ChunkNodeId;
use crate::error::Result;
use crate::tile::{Content, Tile};
use crate::tree::TileTree;
use tiles_lite_core::{B3dmPayload, GltfModel, Refine};
use tiles_lite_geometry::{Aabb, CoordinateTransform};

/// A tile as the renderer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkNode {
    pub id: ChunkNodeId,
    pub parent: Option<ChunkNodeId>,
    pub bbox: Aabb,
    pub geometric_error: f64,
    pub refine: Refine,
    pub has_content: bool,
}

/// Content loader for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkLoader<'a> {
    tile: Tile<'a>,
    id: ChunkNodeId,
}

impl<'a> ChunkLoader<'a> {
    pub fn id(&self) -> ChunkNodeId {
        self.id
    }

    pub fn tile(&self) -> &Tile<'a> {
        &self.tile
    }

    /// b3dm payload of the chunk, `None` when it carries no mesh content.
    pub fn payload(&self) -> Result<Option<&B3dmPayload>> {
        self.tile.b3dm()
    }

    pub fn model(&self) -> Result<Option<&GltfModel>> {
        self.tile.model()
    }
}

/// Answers renderer queries against a [`TileTree`].
#[derive(Debug, Clone)]
pub struct ChunkLoaderFactory<'a> {
    tree: &'a TileTree,
    crs: Option<CoordinateTransform>,
}

impl<'a> ChunkLoaderFactory<'a> {
    /// `crs` is the renderer's frame; `None` keeps the tileset's native one.
    pub fn new(tree: &'a TileTree, crs: Option<CoordinateTransform>) -> Self {
        Self { tree, crs }
    }

    pub fn tree(&self) -> &'a TileTree {
        self.tree
    }

    pub fn crs(&self) -> Option<&CoordinateTransform> {
        self.crs.as_ref()
    }

    /// Bounding box of the whole tileset in the renderer's frame.
    pub fn extent(&self) -> Aabb {
        self.tree.root_bb(self.crs())
    }

    /// Renderer view of `tile`.
    pub fn chunk_node(&self, tile: &Tile<'_>, parent: Option<ChunkNodeId>) -> ChunkNode {
        let bbox = tile.aabb(self.crs());
        let id = self
            .tree
            .tileset()
            .encode_tile_id(tile.depth(), &bbox, self.crs());
        ChunkNode {
            id,
            parent,
            bbox,
            geometric_error: tile.geometric_error(),
            refine: tile.refine(),
            has_content: tile.content_url().is_some(),
        }
    }

    pub fn create_root_node(&self) -> ChunkNode {
        self.chunk_node(&self.tree.root(), None)
    }

    pub fn find_tile(&self, id: &ChunkNodeId) -> Result<Option<Tile<'a>>> {
        self.tree.tileset().find_tile(id, self.crs())
    }

    /// Tiles to show below `id`. A tile with tileset content and no
    /// children of its own contributes the nested root's children, or the
    /// nested root itself when that has none.
    fn child_tiles(&self, tile: &Tile<'a>) -> Result<Vec<Tile<'a>>> {
        let children = tile.children()?;
        if !children.is_empty() {
            return Ok(children);
        }
        match tile.content()? {
            Content::Tileset(nested) => {
                let root = nested.root();
                let grandchildren = root.children()?;
                if grandchildren.is_empty() {
                    Ok(vec![root])
                } else {
                    Ok(grandchildren)
                }
            }
            _ => Ok(Vec::new()),
        }
    }

    pub fn create_children(&self, id: &ChunkNodeId) -> Result<Vec<ChunkNode>> {
        let Some(tile) = self.find_tile(id)? else {
            tracing::warn!(%id, "Children requested for unknown chunk");
            return Ok(Vec::new());
        };
        let children = self.child_tiles(&tile)?;
        Ok(children.iter().map(|child| self.chunk_node(child, Some(*id))).collect())
    }

    /// Number of primitives the renderer should expect below `id`.
    pub fn primitives_count(&self, id: &ChunkNodeId) -> Result<usize> {
        match self.find_tile(id)? {
            Some(tile) => Ok(self.child_tiles(&tile)?.len()),
            None => Ok(0),
        }
    }

    /// Loader for the content of `id`, `None` when no tile matches.
    pub fn content(&self, id: &ChunkNodeId) -> Result<Option<ChunkLoader<'a>>> {
        Ok(self.find_tile(id)?.map(|tile| ChunkLoader { tile, id: *id }))
    }

    pub fn for_tile(&self, tile: Tile<'a>) -> ChunkLoader<'a> {
        let id = self.tree.tileset().tile_id(&tile, self.crs());
        ChunkLoader { tile, id }
    }
}
