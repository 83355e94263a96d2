// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tileset JSON document model.
//!
//! A tileset is parsed in two steps. [`TilesetDocument`] reads the top-level
//! keys and keeps `root` as raw JSON. [`TileObject::parse`] then validates a
//! single tile object, keeping its `children` as raw JSON so that subtrees
//! are only parsed when a caller asks for them.

use crate::error::{Error, Result};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiles_lite_geometry::{matrix_from_wire, BoundingVolume};

/// Refinement strategy for child tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    /// Children replace the parent's content
    #[default]
    Replace,
    /// Children add to the parent's content
    Add,
}

impl Refine {
    /// Case-insensitive parse of `"REPLACE"` / `"ADD"`.
    pub fn parse(tag: &str) -> Result<Self> {
        if tag.eq_ignore_ascii_case("replace") {
            Ok(Refine::Replace)
        } else if tag.eq_ignore_ascii_case("add") {
            Ok(Refine::Add)
        } else {
            Err(Error::format(format!("unknown refine value {tag:?}")))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(default)]
    pub tileset_version: Option<String>,
}

/// Top-level tileset document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetDocument {
    pub asset: Asset,
    pub geometric_error: f64,
    pub root: Value,
    #[serde(default)]
    pub properties: Option<Value>,
}

impl TilesetDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let doc: TilesetDocument = serde_json::from_slice(bytes)?;
        if !doc.geometric_error.is_finite() {
            return Err(Error::format("tileset geometricError is not finite"));
        }
        if !doc.root.is_object() {
            return Err(Error::format("tileset root is not an object"));
        }
        Ok(doc)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTile {
    bounding_volume: RawBoundingVolume,
    geometric_error: Option<f64>,
    refine: Option<String>,
    transform: Option<Vec<f64>>,
    content: Option<RawContent>,
    #[serde(default)]
    children: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawBoundingVolume {
    #[serde(rename = "box")]
    oriented_box: Option<Vec<f64>>,
    sphere: Option<Vec<f64>>,
    region: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct RawContent {
    uri: Option<String>,
    url: Option<String>,
}

impl RawBoundingVolume {
    fn into_volume(self) -> Result<BoundingVolume> {
        let volume = match (self.oriented_box, self.sphere, self.region) {
            (Some(v), None, None) => BoundingVolume::from_box(&v)?,
            (None, Some(v), None) => BoundingVolume::from_sphere(&v)?,
            (None, None, Some(v)) => BoundingVolume::from_region(&v)?,
            (None, None, None) => {
                return Err(Error::format(
                    "boundingVolume has none of box, sphere, region",
                ))
            }
            _ => {
                return Err(Error::format(
                    "boundingVolume must have exactly one of box, sphere, region",
                ))
            }
        };
        Ok(volume)
    }
}

/// Whether a content URI points at a nested tileset rather than a payload.
pub fn is_tileset_uri(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.to_ascii_lowercase().ends_with(".json")
}

/// One validated tile object.
#[derive(Debug, Clone)]
pub struct TileObject {
    pub bounding_volume: BoundingVolume,
    pub geometric_error: f64,
    pub refine: Refine,
    pub transform: Matrix4<f64>,
    pub content_uri: Option<String>,
    /// Unparsed child tile objects, in document order.
    pub children: Vec<Value>,
}

impl TileObject {
    /// Validate a tile object. A missing `refine` takes `inherited`.
    pub fn parse(value: &Value, inherited: Refine) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::format("tile is not a JSON object"));
        }
        let raw = RawTile::deserialize(value)?;

        let bounding_volume = raw.bounding_volume.into_volume()?;
        let geometric_error = raw
            .geometric_error
            .ok_or_else(|| Error::format("tile has no geometricError"))?;
        let refine = match raw.refine.as_deref() {
            Some(tag) => Refine::parse(tag)?,
            None => inherited,
        };
        let transform = match raw.transform {
            Some(values) => matrix_from_wire(&values)?,
            None => Matrix4::identity(),
        };
        let content_uri = match raw.content {
            Some(content) => Some(content.uri.or(content.url).ok_or_else(|| {
                Error::format("tile content has neither uri nor url")
            })?),
            None => None,
        };

        let mut children = raw.children.unwrap_or_default();
        if let Some(uri) = content_uri.as_deref() {
            if is_tileset_uri(uri) && !children.is_empty() {
                tracing::debug!(uri, ignored = children.len(), "Tileset content tile cannot have children");
                children.clear();
            }
        }

        Ok(Self {
            bounding_volume,
            geometric_error,
            refine,
            transform,
            content_uri,
            children,
        })
    }
}
