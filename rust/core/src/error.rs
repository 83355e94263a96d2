// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for document and payload decoding
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading tileset documents and tile payloads
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid input: bad magic, malformed JSON, missing or
    /// ill-typed fields, unknown tags.
    #[error("Format error: {0}")]
    Format(String),

    /// The stream ended before a declared section was complete.
    #[error("Truncated {section}: expected {expected} bytes, got {actual}")]
    TruncatedRead {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Mesh decode error: {0}")]
    GltfDecode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Format(format!("invalid JSON: {e}"))
    }
}

impl From<tiles_lite_geometry::Error> for Error {
    fn from(e: tiles_lite_geometry::Error) -> Self {
        Error::Format(e.to_string())
    }
}
