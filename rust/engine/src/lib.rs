// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tiles-Lite Engine
//!
//! A lazily expanded 3D Tiles hierarchy.
//!
//! - [`TileTree`] owns every tile and tileset reachable from one top-level
//!   tileset document; [`Tile`] and [`Tileset`] are cheap handles into it
//! - children, nested tilesets and b3dm payloads are materialised on first
//!   access, once, also from concurrent renderer threads
//! - [`ChunkNodeId`] addresses tiles spatially, [`ChunkLoaderFactory`]
//!   answers renderer queries in terms of those ids
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tiles_lite_cache::{CacheConfig, CacheManager, HttpFetcher};
//! use tiles_lite_engine::{ChunkLoaderFactory, TileTree, TilesetOptions};
//!
//! let fetcher = HttpFetcher::new(std::time::Duration::from_secs(60))?;
//! let cache = Arc::new(CacheManager::new(CacheConfig::new(".cache/3dtiles"), Arc::new(fetcher)));
//! let tree = TileTree::open("https://example.com/city/tileset.json", TilesetOptions::named("city"), cache)?;
//!
//! let factory = ChunkLoaderFactory::new(&tree, None);
//! let root = factory.create_root_node();
//! for child in factory.create_children(&root.id)? {
//!     println!("{} error={}", child.id, child.geometric_error);
//! }
//! ```

mod arena;
pub mod chunk;
pub mod error;
pub mod keys;
pub mod loader;
pub mod options;
pub mod tile;
pub mod tileset;
pub mod tree;

pub use chunk::ChunkNodeId;
pub use error::{Error, Result};
pub use keys::{TileKey, TilesetKey};
pub use loader::{ChunkLoader, ChunkLoaderFactory, ChunkNode};
pub use options::{TilesetOptions, DEFAULT_TILESET_NAME};
pub use tile::{B3dmContent, Content, ContentKind, Tile};
pub use tileset::Tileset;
pub use tree::{location_to_url, TileTree};

pub use tiles_lite_core::Refine;
