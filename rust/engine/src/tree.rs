// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The tile tree: owner of every tile and tileset reachable from one
//! top-level tileset document.
//!
//! Only the top-level root is parsed eagerly. Children are expanded the
//! first time they are asked for, nested tilesets are fetched when the
//! content of the referencing tile is resolved, and b3dm payloads are
//! fetched when their bytes are needed. Each of these steps runs at most
//! once per node, also under concurrent access.

use crate::arena::{ContentSlot, NewTileset, TileArena, TileNode, TilesetNode};
use crate::error::{Error, Result};
use crate::keys::{TileKey, TilesetKey};
use crate::options::TilesetOptions;
use crate::tile::Tile;
use crate::tileset::Tileset;
use nalgebra::Matrix4;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tiles_lite_cache::CacheManager;
use tiles_lite_core::{
    is_tileset_uri, B3dmPayload, GlbDecoder, GltfDecoder, Refine, TileObject, TilesetDocument,
};
use tiles_lite_geometry::{Aabb, CoordinateTransform};
use url::Url;

/// Turn a tileset location (URL or filesystem path) into a URL.
pub fn location_to_url(location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        // A one-letter scheme is a Windows drive, not a URL.
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::InvalidUrl {
                url: location.to_string(),
                reason: e.to_string(),
            })?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| Error::InvalidUrl {
        url: location.to_string(),
        reason: "not an absolute path".into(),
    })
}

fn join_content_url(base: &Url, uri: &str) -> Result<Url> {
    base.join(uri).map_err(|e| {
        Error::Core(tiles_lite_core::Error::format(format!(
            "content uri {uri:?} cannot be resolved against {base}: {e}"
        )))
    })
}

fn parse_child(
    raw: &serde_json::Value,
    inherited_refine: Refine,
    base: &Url,
) -> Result<(TileObject, Option<Url>)> {
    let object = TileObject::parse(raw, inherited_refine)?;
    let content_url = object
        .content_uri
        .as_deref()
        .map(|uri| join_content_url(base, uri))
        .transpose()?;
    Ok((object, content_url))
}

/// Owner of a 3D Tiles hierarchy.
pub struct TileTree {
    arena: TileArena,
    top_key: TilesetKey,
    top: Arc<TilesetNode>,
    options: TilesetOptions,
    cache: Arc<CacheManager>,
    decoder: Arc<dyn GltfDecoder>,
    /// Root bounding box per output frame.
    root_bbs: RwLock<HashMap<Option<CoordinateTransform>, Aabb>>,
}

impl std::fmt::Debug for TileTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileTree")
            .field("options", &self.options)
            .field("tiles", &self.arena.tile_count())
            .field("tilesets", &self.arena.tileset_count())
            .finish_non_exhaustive()
    }
}

impl TileTree {
    /// Fetch and parse the tileset at `location` (URL or local path).
    pub fn open(location: &str, options: TilesetOptions, cache: Arc<CacheManager>) -> Result<Self> {
        let url = location_to_url(location)?;
        let bytes = cache.read(url.as_str(), &options.name)?;
        Self::from_document(&bytes, url, options, cache)
    }

    /// Parse a tileset document already in memory. `url` is the document's
    /// own location; relative content URIs are resolved against it.
    pub fn from_document(
        bytes: &[u8],
        url: Url,
        options: TilesetOptions,
        cache: Arc<CacheManager>,
    ) -> Result<Self> {
        let arena = TileArena::default();
        let (top_key, top) =
            Self::insert_document(&arena, bytes, url.clone(), 0, None, Refine::Replace)?;
        tracing::info!(url = %url, name = %options.name, "Opened tileset");
        Ok(Self {
            arena,
            top_key,
            top,
            options,
            cache,
            decoder: Arc::new(GlbDecoder),
            root_bbs: RwLock::default(),
        })
    }

    /// Replace the mesh decoder used for b3dm payloads.
    pub fn with_decoder(mut self, decoder: Arc<dyn GltfDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    fn insert_document(
        arena: &TileArena,
        bytes: &[u8],
        url: Url,
        depth: u32,
        referencing_tile: Option<TileKey>,
        inherited_refine: Refine,
    ) -> Result<(TilesetKey, Arc<TilesetNode>)> {
        let doc = TilesetDocument::from_slice(bytes)?;
        let root = TileObject::parse(&doc.root, inherited_refine)?;
        let root_content_url = root
            .content_uri
            .as_deref()
            .map(|uri| join_content_url(&url, uri))
            .transpose()?;
        Ok(arena.insert_tileset(NewTileset {
            url,
            asset_version: doc.asset.version,
            geometric_error: doc.geometric_error,
            properties: doc.properties,
            depth,
            referencing_tile,
            root,
            root_content_url,
        }))
    }

    pub fn options(&self) -> &TilesetOptions {
        &self.options
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn decoder(&self) -> &dyn GltfDecoder {
        self.decoder.as_ref()
    }

    /// The top-level tileset.
    pub fn tileset(&self) -> Tileset<'_> {
        Tileset::new(self, self.top_key, self.top.clone())
    }

    /// Root tile of the top-level tileset.
    pub fn root(&self) -> Tile<'_> {
        self.tileset().root()
    }

    pub fn tile(&self, key: TileKey) -> Option<Tile<'_>> {
        self.arena.tile(key).map(|node| Tile::new(self, key, node))
    }

    pub fn tileset_by_key(&self, key: TilesetKey) -> Option<Tileset<'_>> {
        self.arena.tileset(key).map(|node| Tileset::new(self, key, node))
    }

    /// Number of tiles materialised so far.
    pub fn tile_count(&self) -> usize {
        self.arena.tile_count()
    }

    /// Number of tileset documents loaded so far, the top-level one included.
    pub fn tileset_count(&self) -> usize {
        self.arena.tileset_count()
    }

    /// Bounding box of the top-level root in the frame of `crs`, computed
    /// once per frame. Chunk ids are offsets from its center.
    pub fn root_bb(&self, crs: Option<&CoordinateTransform>) -> Aabb {
        let key = crs.copied();
        if let Some(bb) = self.root_bbs.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return *bb;
        }
        let bb = self.root().aabb(crs);
        *self
            .root_bbs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(bb)
    }

    /// Expand the children of `node` on first call. Children that fail to
    /// parse are skipped and logged.
    pub(crate) fn children_of<'n>(&self, key: TileKey, node: &'n TileNode) -> Result<&'n [TileKey]> {
        let keys = node.children.get_or_try_init(|| {
            let tileset = self
                .arena
                .tileset(node.tileset)
                .ok_or(Error::UnknownTileset(node.tileset))?;
            let mut parsed = Vec::with_capacity(node.object.children.len());
            for (index, raw) in node.object.children.iter().enumerate() {
                match parse_child(raw, node.object.refine, &tileset.url) {
                    Ok((object, content_url)) => parsed.push(TileNode::new(
                        node.tileset,
                        Some(key),
                        node.depth + 1,
                        object,
                        content_url,
                    )),
                    // A malformed child is dropped; its siblings stay reachable.
                    Err(e) => {
                        tracing::warn!(depth = node.depth, index, error = %e, "Skipping malformed tile");
                    }
                }
            }
            let skipped = node.object.children.len() - parsed.len();
            let keys = self.arena.insert_tiles(parsed);
            tracing::debug!(
                depth = node.depth,
                children = keys.len(),
                skipped,
                "Expanded tile children"
            );
            Ok::<_, Error>(keys)
        });
        match keys {
            Ok(keys) => Ok(keys.as_slice()),
            Err(e) => {
                tracing::warn!(depth = node.depth, error = %e, "Failed to expand tile children");
                Err(e)
            }
        }
    }

    /// Combined transform of a tile: parent's combined transform times the
    /// tile's local transform. Memoized on every tile along the way.
    pub(crate) fn combined_transform_of(&self, node: &Arc<TileNode>) -> Matrix4<f64> {
        if let Some(m) = node.combined.get() {
            return *m;
        }
        let mut chain = vec![node.clone()];
        let mut base = Matrix4::identity();
        let mut parent = node.parent;
        while let Some(key) = parent {
            let Some(ancestor) = self.arena.tile(key) else {
                tracing::error!(?key, "Dangling parent link");
                break;
            };
            if let Some(m) = ancestor.combined.get() {
                base = *m;
                break;
            }
            parent = ancestor.parent;
            chain.push(ancestor);
        }
        for n in chain.iter().rev() {
            base = *n.combined.get_or_init(|| base * n.object.transform);
        }
        base
    }

    /// Resolve the content of a tile on first call. Failures are returned
    /// and not remembered, a later call tries again.
    pub(crate) fn content_of<'n>(&self, key: TileKey, node: &'n TileNode) -> Result<&'n ContentSlot> {
        node.content.get_or_try_init(|| {
            let url = match &node.content_url {
                None => return Ok(ContentSlot::Unmanaged),
                Some(url) => url,
            };
            if !is_tileset_uri(url.path()) {
                return Ok(ContentSlot::B3dm {
                    url: url.clone(),
                    payload: OnceCell::new(),
                });
            }
            let bytes = self.read_remote(url).map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Failed to fetch nested tileset");
                e
            })?;
            let (ts_key, _) = Self::insert_document(
                &self.arena,
                &bytes,
                url.clone(),
                node.depth + 1,
                Some(key),
                node.object.refine,
            )?;
            tracing::debug!(url = %url, depth = node.depth + 1, "Loaded nested tileset");
            Ok(ContentSlot::Tileset(ts_key))
        })
    }

    /// Fetch and decode a b3dm payload on first call.
    pub(crate) fn payload_of<'s>(
        &self,
        url: &Url,
        payload: &'s OnceCell<B3dmPayload>,
    ) -> Result<&'s B3dmPayload> {
        payload.get_or_try_init(|| {
            let path = self.cache.retrieve(url.as_str(), &self.options.name)?;
            let file = std::fs::File::open(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            B3dmPayload::read(BufReader::new(file), url.as_str()).map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Failed to decode b3dm");
                Error::from(e)
            })
        })
    }

    fn read_remote(&self, url: &Url) -> Result<Vec<u8>> {
        Ok(self.cache.read(url.as_str(), &self.options.name)?)
    }
}
