// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for content retrieval.

use std::path::PathBuf;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network fetch did not complete successfully.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// A cache directory or cache file could not be created.
    #[error("cache directory error at {}: {source}", path.display())]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A retrieved file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `file://` URL that does not map to a local path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
