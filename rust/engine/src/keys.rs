// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena keys.
//!
//! Tiles and tilesets are stored in `slotmap::SlotMap`s owned by the tree.
//! Parent links are keys, never references, so nodes can be shared across
//! threads without back-pointers.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a tile, stable for the lifetime of its tree.
    pub struct TileKey;

    /// Key for a tileset document (the top-level one or a nested one).
    pub struct TilesetKey;
}
