// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tiles-Lite Core
//!
//! Readers for the two file formats of a 3D Tiles dataset:
//!
//! - **Tileset JSON**: [`TilesetDocument`] and [`TileObject`], with tile
//!   children kept unparsed until needed
//! - **b3dm payloads**: [`B3dmPayload`], a streaming decoder for the header,
//!   feature table and batch table, with the embedded glTF decoded lazily
//!   through a [`GltfDecoder`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tiles_lite_core::{B3dmPayload, GlbDecoder, DecodeOptions};
//!
//! let file = std::fs::File::open("tile.b3dm")?;
//! let payload = B3dmPayload::read(std::io::BufReader::new(file), "tile.b3dm")?;
//! println!("batch length: {}", payload.feature_table.batch_length);
//! if let Some(model) = payload.model(&GlbDecoder, &DecodeOptions::default()) {
//!     println!("{} meshes", model.mesh_count);
//! }
//! ```

pub mod b3dm;
pub mod document;
pub mod error;
pub mod gltf;

pub use b3dm::{write_b3dm, B3dmHeader, B3dmPayload, BatchTable, FeatureTable, HEADER_LEN};
pub use document::{is_tileset_uri, Asset, Refine, TileObject, TilesetDocument};
pub use error::{Error, Result};
pub use gltf::{encode_glb, DecodeOptions, GlbDecoder, GltfDecoder, GltfModel};
