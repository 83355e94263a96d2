// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for tile tree operations.

use crate::keys::{TileKey, TilesetKey};
use std::path::PathBuf;

/// Result type alias for tile tree operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed document or payload, truncated stream, bad magic.
    #[error(transparent)]
    Core(#[from] tiles_lite_core::Error),

    /// Fetch or cache failure.
    #[error(transparent)]
    Cache(#[from] tiles_lite_cache::Error),

    /// A retrieved file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tileset location or content URI that cannot be turned into a URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A key that does not belong to this tree.
    #[error("tile not found: {0:?}")]
    UnknownTile(TileKey),

    #[error("tileset not found: {0:?}")]
    UnknownTileset(TilesetKey),
}

impl Error {
    /// Whether the error comes from malformed input rather than I/O.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::Core(tiles_lite_core::Error::Format(_))
                | Error::Core(tiles_lite_core::Error::TruncatedRead { .. })
        )
    }
}
