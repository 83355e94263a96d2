// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::arena::TilesetNode;
use crate::keys::{TileKey, TilesetKey};
use crate::tile::Tile;
use crate::tree::TileTree;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Borrowed handle to one tileset document of a [`TileTree`].
#[derive(Clone)]
pub struct Tileset<'a> {
    tree: &'a TileTree,
    key: TilesetKey,
    node: Arc<TilesetNode>,
}

impl std::fmt::Debug for Tileset<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tileset")
            .field("key", &self.key)
            .field("url", &self.node.url.as_str())
            .field("depth", &self.node.depth)
            .finish()
    }
}

impl<'a> Tileset<'a> {
    pub(crate) fn new(tree: &'a TileTree, key: TilesetKey, node: Arc<TilesetNode>) -> Self {
        Self { tree, key, node }
    }

    pub fn key(&self) -> TilesetKey {
        self.key
    }

    pub fn tree(&self) -> &'a TileTree {
        self.tree
    }

    /// Location of the document.
    pub fn url(&self) -> &Url {
        &self.node.url
    }

    pub fn asset_version(&self) -> &str {
        &self.node.asset_version
    }

    pub fn declared_geometric_error(&self) -> f64 {
        self.node.geometric_error
    }

    /// Document-level geometric error, scaled by depth like tile errors.
    pub fn geometric_error(&self) -> f64 {
        self.tree
            .options()
            .effective_geometric_error(self.node.geometric_error, self.node.depth)
    }

    pub fn properties(&self) -> Option<&Value> {
        self.node.properties.as_ref()
    }

    /// 0 for the top-level document, one more than the referencing tile
    /// for nested ones.
    pub fn depth(&self) -> u32 {
        self.node.depth
    }

    pub fn root(&self) -> Tile<'a> {
        Tile::new(self.tree, self.node.root, self.node.root_node.clone())
    }

    pub fn root_key(&self) -> TileKey {
        self.node.root
    }

    /// Tile whose content this document is, `None` at the top level.
    pub fn referencing_tile(&self) -> Option<Tile<'a>> {
        self.node.referencing_tile.and_then(|key| self.tree.tile(key))
    }

    pub fn is_top_level(&self) -> bool {
        self.node.referencing_tile.is_none()
    }
}
