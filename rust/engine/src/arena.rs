// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena storage for tiles and tilesets.
//!
//! Nodes are immutable once inserted except for their compute-once cells
//! (children, combined transform, content). The maps are only locked for
//! the duration of a lookup or an insert; lazy work happens on an `Arc`
//! clone of the node outside any arena lock.

use crate::keys::{TileKey, TilesetKey};
use nalgebra::Matrix4;
use once_cell::sync::OnceCell;
use serde_json::Value;
use slotmap::SlotMap;
use std::sync::{Arc, PoisonError, RwLock};
use tiles_lite_core::{B3dmPayload, TileObject};
use url::Url;

/// Resolved content of a tile.
#[derive(Debug)]
pub(crate) enum ContentSlot {
    Unmanaged,
    Tileset(TilesetKey),
    B3dm {
        url: Url,
        payload: OnceCell<B3dmPayload>,
    },
}

#[derive(Debug)]
pub(crate) struct TileNode {
    pub tileset: TilesetKey,
    /// Parent tile; for a nested root, the tile whose content it is.
    pub parent: Option<TileKey>,
    pub depth: u32,
    pub object: TileObject,
    pub content_url: Option<Url>,
    pub children: OnceCell<Vec<TileKey>>,
    pub combined: OnceCell<Matrix4<f64>>,
    pub content: OnceCell<ContentSlot>,
}

impl TileNode {
    pub fn new(
        tileset: TilesetKey,
        parent: Option<TileKey>,
        depth: u32,
        object: TileObject,
        content_url: Option<Url>,
    ) -> Self {
        Self {
            tileset,
            parent,
            depth,
            object,
            content_url,
            children: OnceCell::new(),
            combined: OnceCell::new(),
            content: OnceCell::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TilesetNode {
    pub url: Url,
    pub asset_version: String,
    pub geometric_error: f64,
    pub properties: Option<Value>,
    pub depth: u32,
    pub referencing_tile: Option<TileKey>,
    pub root: TileKey,
    pub root_node: Arc<TileNode>,
}

/// Everything needed to insert a tileset and its root tile in one step.
pub(crate) struct NewTileset {
    pub url: Url,
    pub asset_version: String,
    pub geometric_error: f64,
    pub properties: Option<Value>,
    pub depth: u32,
    pub referencing_tile: Option<TileKey>,
    pub root: TileObject,
    pub root_content_url: Option<Url>,
}

#[derive(Debug, Default)]
pub(crate) struct TileArena {
    tiles: RwLock<SlotMap<TileKey, Arc<TileNode>>>,
    tilesets: RwLock<SlotMap<TilesetKey, Arc<TilesetNode>>>,
}

impl TileArena {
    pub fn tile(&self, key: TileKey) -> Option<Arc<TileNode>> {
        let tiles = self.tiles.read().unwrap_or_else(PoisonError::into_inner);
        tiles.get(key).cloned()
    }

    pub fn tileset(&self, key: TilesetKey) -> Option<Arc<TilesetNode>> {
        let tilesets = self.tilesets.read().unwrap_or_else(PoisonError::into_inner);
        tilesets.get(key).cloned()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn tileset_count(&self) -> usize {
        self.tilesets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Insert a batch of tiles, returning their keys in order.
    pub fn insert_tiles(&self, nodes: Vec<TileNode>) -> Vec<TileKey> {
        let mut tiles = self.tiles.write().unwrap_or_else(PoisonError::into_inner);
        nodes.into_iter().map(|n| tiles.insert(Arc::new(n))).collect()
    }

    /// Insert a tileset together with its root tile.
    ///
    /// Lock order is tilesets, then tiles.
    pub fn insert_tileset(&self, new: NewTileset) -> (TilesetKey, Arc<TilesetNode>) {
        let mut tilesets = self.tilesets.write().unwrap_or_else(PoisonError::into_inner);
        let ts_key = tilesets.insert_with_key(|ts_key| {
            let root_node = Arc::new(TileNode::new(
                ts_key,
                new.referencing_tile,
                new.depth,
                new.root,
                new.root_content_url,
            ));
            let root = self
                .tiles
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(root_node.clone());
            Arc::new(TilesetNode {
                url: new.url,
                asset_version: new.asset_version,
                geometric_error: new.geometric_error,
                properties: new.properties,
                depth: new.depth,
                referencing_tile: new.referencing_tile,
                root,
                root_node,
            })
        });
        let node = tilesets[ts_key].clone();
        (ts_key, node)
    }
}
