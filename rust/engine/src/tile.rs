// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tile handles.

use crate::arena::{ContentSlot, TileNode};
use crate::error::{Error, Result};
use crate::keys::TileKey;
use crate::tileset::Tileset;
use crate::tree::TileTree;
use nalgebra::{Matrix4, Point3};
use std::sync::Arc;
use tiles_lite_core::{B3dmPayload, GltfModel, Refine};
use tiles_lite_geometry::{Aabb, BoundingVolume, CoordinateTransform, Cube};
use url::Url;

/// Borrowed handle to one tile of a [`TileTree`].
#[derive(Clone)]
pub struct Tile<'a> {
    tree: &'a TileTree,
    key: TileKey,
    node: Arc<TileNode>,
}

impl std::fmt::Debug for Tile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("key", &self.key)
            .field("depth", &self.node.depth)
            .field("content_url", &self.node.content_url.as_ref().map(Url::as_str))
            .finish()
    }
}

/// Two handles are equal when they designate the same tile.
impl PartialEq for Tile<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && std::ptr::eq(self.tree, other.tree)
    }
}

impl Eq for Tile<'_> {}

impl<'a> Tile<'a> {
    pub(crate) fn new(tree: &'a TileTree, key: TileKey, node: Arc<TileNode>) -> Self {
        Self { tree, key, node }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn tree(&self) -> &'a TileTree {
        self.tree
    }

    pub fn depth(&self) -> u32 {
        self.node.depth
    }

    pub fn refine(&self) -> Refine {
        self.node.object.refine
    }

    pub fn bounding_volume(&self) -> &BoundingVolume {
        &self.node.object.bounding_volume
    }

    pub fn local_transform(&self) -> &Matrix4<f64> {
        &self.node.object.transform
    }

    /// Geometric error as written in the document.
    pub fn declared_geometric_error(&self) -> f64 {
        self.node.object.geometric_error
    }

    /// Geometric error used for LOD selection, see
    /// [`TilesetOptions::effective_geometric_error`](crate::TilesetOptions::effective_geometric_error).
    pub fn geometric_error(&self) -> f64 {
        self.tree
            .options()
            .effective_geometric_error(self.node.object.geometric_error, self.node.depth)
    }

    /// Resolved content URL, if the tile has content.
    pub fn content_url(&self) -> Option<&Url> {
        self.node.content_url.as_ref()
    }

    /// Parent tile. The root of a nested tileset reports the tile that
    /// references it.
    pub fn parent(&self) -> Option<Tile<'a>> {
        self.node.parent.and_then(|key| self.tree.tile(key))
    }

    /// Tileset document this tile was declared in.
    pub fn tileset(&self) -> Result<Tileset<'a>> {
        self.tree
            .tileset_by_key(self.node.tileset)
            .ok_or(Error::UnknownTileset(self.node.tileset))
    }

    /// Child tiles in document order, parsed on first call.
    pub fn children(&self) -> Result<Vec<Tile<'a>>> {
        let keys = self.tree.children_of(self.key, &self.node)?;
        keys.iter()
            .map(|&key| self.tree.tile(key).ok_or(Error::UnknownTile(key)))
            .collect()
    }

    /// Whether the children have been parsed already.
    pub fn children_expanded(&self) -> bool {
        self.node.children.get().is_some()
    }

    /// Number of child tiles declared in the document.
    pub fn declared_child_count(&self) -> usize {
        self.node.object.children.len()
    }

    pub fn combined_transform(&self) -> Matrix4<f64> {
        self.tree.combined_transform_of(&self.node)
    }

    /// Bounding volume corners in world space, optionally reprojected.
    pub fn cube(&self, crs: Option<&CoordinateTransform>) -> Cube {
        self.bounding_volume().as_cube(&self.combined_transform(), crs)
    }

    /// World-space bounding box, Y-up when the tree is opened with `flip_y`.
    pub fn aabb(&self, crs: Option<&CoordinateTransform>) -> Aabb {
        self.bounding_volume()
            .as_aabb(&self.combined_transform(), crs, self.tree.options().flip_y)
    }

    pub fn outline(&self, crs: Option<&CoordinateTransform>) -> Vec<Point3<f64>> {
        self.bounding_volume().as_outline(&self.combined_transform(), crs)
    }

    /// Whether `p`, in the same frame as [`Self::aabb`], lies in the tile.
    pub fn contains(&self, p: &Point3<f64>, crs: Option<&CoordinateTransform>) -> bool {
        self.aabb(crs).contains(p, 0.0)
    }

    /// Resolve the tile's content on first call. A `.json` URI loads the
    /// nested tileset; other URIs give b3dm content whose payload is only
    /// fetched when asked for.
    pub fn content(&self) -> Result<Content<'a>> {
        let slot = self.tree.content_of(self.key, &self.node)?;
        Ok(match slot {
            ContentSlot::Unmanaged => Content::Unmanaged,
            ContentSlot::Tileset(key) => Content::Tileset(
                self.tree
                    .tileset_by_key(*key)
                    .ok_or(Error::UnknownTileset(*key))?,
            ),
            ContentSlot::B3dm { url, .. } => Content::B3dm(B3dmContent {
                tile: self.clone(),
                url: url.clone(),
            }),
        })
    }

    pub fn content_resolved(&self) -> bool {
        self.node.content.get().is_some()
    }

    /// Decoded b3dm payload, `None` for tiles without b3dm content.
    pub fn b3dm(&self) -> Result<Option<&B3dmPayload>> {
        match self.tree.content_of(self.key, &self.node)? {
            ContentSlot::B3dm { url, payload } => self.tree.payload_of(url, payload).map(Some),
            _ => Ok(None),
        }
    }

    /// Mesh model of the b3dm payload, decoded on first call. A payload
    /// whose mesh fails to decode yields `None`.
    pub fn model(&self) -> Result<Option<&GltfModel>> {
        let Some(payload) = self.b3dm()? else {
            return Ok(None);
        };
        Ok(payload.model(self.tree.decoder(), &self.tree.options().decode_options()))
    }
}

/// Content of a tile.
#[derive(Debug, Clone)]
pub enum Content<'a> {
    /// No content, or content this engine does not manage.
    Unmanaged,
    /// A nested tileset document.
    Tileset(Tileset<'a>),
    /// A b3dm payload, fetched lazily.
    B3dm(B3dmContent<'a>),
}

impl<'a> Content<'a> {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Unmanaged => ContentKind::Unmanaged,
            Content::Tileset(_) => ContentKind::Tileset,
            Content::B3dm(_) => ContentKind::B3dm,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match self {
            Content::Unmanaged => None,
            Content::Tileset(ts) => Some(ts.url()),
            Content::B3dm(b) => Some(b.url()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Unmanaged,
    Tileset,
    B3dm,
}

/// b3dm content of a tile.
#[derive(Debug, Clone)]
pub struct B3dmContent<'a> {
    tile: Tile<'a>,
    url: Url,
}

impl<'a> B3dmContent<'a> {
    pub fn tile(&self) -> &Tile<'a> {
        &self.tile
    }

    pub fn depth(&self) -> u32 {
        self.tile.depth()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_loaded(&self) -> bool {
        matches!(
            self.tile.node.content.get(),
            Some(ContentSlot::B3dm { payload, .. }) if payload.get().is_some()
        )
    }

    /// Fetch and decode the payload on first call.
    pub fn payload(&self) -> Result<&B3dmPayload> {
        self.tile.b3dm()?.ok_or(Error::UnknownTile(self.tile.key))
    }

    pub fn model(&self) -> Result<Option<&GltfModel>> {
        self.tile.model()
    }
}
