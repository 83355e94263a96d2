// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building geometry from wire values
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid bounding volume: {0}")]
    InvalidVolume(String),

    #[error("Invalid transform: expected 16 numbers, got {0}")]
    InvalidTransform(usize),

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),
}
