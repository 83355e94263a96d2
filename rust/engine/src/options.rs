// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tiles_lite_core::DecodeOptions;

/// Namespace used when a tileset is opened without a name.
pub const DEFAULT_TILESET_NAME: &str = "no_name";

/// Processing options of a tile tree.
///
/// Set once on the top-level tileset; nested tilesets always read them from
/// there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetOptions {
    /// Cache namespace.
    pub name: String,
    /// Bounding boxes are reported Y-up instead of Z-up.
    pub flip_y: bool,
    /// Apply the b3dm `RTC_CENTER` as a model translation.
    pub correct_translation: bool,
    /// Ask the mesh decoder to substitute a flat material.
    pub use_fake_material: bool,
    /// Report declared geometric errors instead of depth-scaled ones.
    pub use_original_geometric_error: bool,
}

impl Default for TilesetOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_TILESET_NAME.to_string(),
            flip_y: false,
            correct_translation: false,
            use_fake_material: false,
            use_original_geometric_error: false,
        }
    }
}

impl TilesetOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            rtc_center: None,
            correct_translation: self.correct_translation,
            use_fake_material: self.use_fake_material,
            flip_y: self.flip_y,
        }
    }

    /// Geometric error as reported to the renderer: `error / depth²` below
    /// the root unless original errors are requested.
    pub fn effective_geometric_error(&self, declared: f64, depth: u32) -> f64 {
        if self.use_original_geometric_error || depth == 0 {
            declared
        } else {
            declared / f64::from(depth).powi(2)
        }
    }
}
