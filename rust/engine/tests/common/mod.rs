// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixture datasets written to a temporary directory.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiles_lite_cache::{CacheConfig, CacheManager, Error, Fetcher, Result};
use tiles_lite_core::{encode_glb, write_b3dm};
use tiles_lite_engine::{TileTree, TilesetOptions};
use url::Url;

/// Fixtures are local; any network access is a test failure.
pub struct Offline;

impl Fetcher for Offline {
    fn fetch(&self, url: &Url) -> Result<PathBuf> {
        Err(Error::FetchFailed {
            url: url.to_string(),
            reason: "offline".into(),
        })
    }
}

pub const MIRROR_HOST: &str = "https://tiles.example.com/";

/// Serves `MIRROR_HOST` URLs from a local directory, staging a copy of each
/// file the way a network download would.
pub struct Mirror {
    pub root: PathBuf,
    pub staging: PathBuf,
}

impl Fetcher for Mirror {
    fn fetch(&self, url: &Url) -> Result<PathBuf> {
        let fail = |reason: String| Error::FetchFailed {
            url: url.to_string(),
            reason,
        };
        let relative = url
            .as_str()
            .strip_prefix(MIRROR_HOST)
            .ok_or_else(|| fail("unknown host".into()))?;
        let bytes = std::fs::read(self.root.join(relative)).map_err(|e| fail(e.to_string()))?;
        let tmp = tempfile::NamedTempFile::new_in(&self.staging).map_err(|e| fail(e.to_string()))?;
        std::fs::write(tmp.path(), bytes).map_err(|e| fail(e.to_string()))?;
        let (_, path) = tmp.keep().map_err(|e| fail(e.to_string()))?;
        Ok(path)
    }
}

/// Cache whose fetcher mirrors `dir`; downloads are staged in `dir/staging`.
pub fn mirror_cache(dir: &Path) -> Arc<CacheManager> {
    let staging = dir.join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    let mirror = Mirror {
        root: dir.to_path_buf(),
        staging,
    };
    Arc::new(CacheManager::new(CacheConfig::new(dir.join("cache")), Arc::new(mirror)))
}

pub fn cache(dir: &Path) -> Arc<CacheManager> {
    Arc::new(CacheManager::new(CacheConfig::new(dir.join("cache")), Arc::new(Offline)))
}

pub fn bbox(center: [f64; 3], half: f64) -> Value {
    json!([
        center[0], center[1], center[2],
        half, 0.0, 0.0,
        0.0, half, 0.0,
        0.0, 0.0, half
    ])
}

pub fn translation(x: f64, y: f64, z: f64) -> Value {
    json!([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        x, y, z, 1.0
    ])
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// A b3dm with two batched features and a one-mesh GLB.
pub fn write_tile(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let glb = encode_glb(
        &json!({
            "asset": {"version": "2.0"},
            "meshes": [{"primitives": [{"attributes": {}}, {"attributes": {}}]}]
        }),
        &[0u8; 12],
    );
    let ft = br#"{"BATCH_LENGTH":2,"RTC_CENTER":[1.0,2.0,3.0]}    "#;
    let mut bytes = Vec::new();
    write_b3dm(&mut bytes, ft, &[], &[], &[], &glb).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// City dataset:
///
/// ```text
/// root (translated by x+10, ADD)
/// ├── a       b3dm          x ∈ [-90, 10]
/// └── b       sub tileset   x ∈ [10, 110], translated by z+5
///     └── sub root
///         └── leaf  b3dm    center (70, 0, 5)
/// ```
pub fn write_city(dir: &Path) -> PathBuf {
    let top = dir.join("city").join("tileset.json");
    write_json(
        &top,
        &json!({
            "asset": {"version": "1.0"},
            "geometricError": 1000.0,
            "root": {
                "boundingVolume": {"box": bbox([0.0, 0.0, 0.0], 100.0)},
                "geometricError": 500.0,
                "refine": "ADD",
                "transform": translation(10.0, 0.0, 0.0),
                "children": [
                    {
                        "boundingVolume": {"box": bbox([-50.0, 0.0, 0.0], 50.0)},
                        "geometricError": 100.0,
                        "content": {"uri": "tiles/a.b3dm"}
                    },
                    {
                        "boundingVolume": {"box": bbox([50.0, 0.0, 0.0], 50.0)},
                        "geometricError": 100.0,
                        "transform": translation(0.0, 0.0, 5.0),
                        "content": {"url": "sub/tileset.json"}
                    }
                ]
            }
        }),
    );
    write_json(
        &dir.join("city").join("sub").join("tileset.json"),
        &json!({
            "asset": {"version": "1.0"},
            "geometricError": 80.0,
            "root": {
                "boundingVolume": {"box": bbox([50.0, 0.0, 0.0], 50.0)},
                "geometricError": 40.0,
                "refine": "REPLACE",
                "children": [
                    {
                        "boundingVolume": {"box": bbox([60.0, 0.0, 0.0], 20.0)},
                        "geometricError": 9.0,
                        "content": {"uri": "leaf.b3dm"}
                    }
                ]
            }
        }),
    );
    write_tile(&dir.join("city").join("tiles").join("a.b3dm"));
    write_tile(&dir.join("city").join("sub").join("leaf.b3dm"));
    top
}

pub fn open_city(dir: &Path) -> TileTree {
    let top = write_city(dir);
    TileTree::open(top.to_str().unwrap(), TilesetOptions::named("city"), cache(dir)).unwrap()
}
