// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inspector configuration loaded from environment variables.

use std::path::PathBuf;
use tiles_lite_engine::{TilesetOptions, DEFAULT_TILESET_NAME};

/// Inspector configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the tile cache.
    pub cache_dir: PathBuf,
    /// Cache namespace of the dataset.
    pub name: String,
    /// Report bounding boxes Y-up.
    pub flip_y: bool,
    /// Report declared geometric errors.
    pub use_original_geometric_error: bool,
    /// HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            cache_dir: std::env::var("TILES_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    std::env::current_dir()
                        .map(|dir| dir.join(".cache").join("3dtiles"))
                        .unwrap_or_else(|_| PathBuf::from("./.cache/3dtiles"))
                }),
            name: std::env::var("TILES_NAME").unwrap_or_else(|_| DEFAULT_TILESET_NAME.into()),
            flip_y: std::env::var("TILES_FLIP_Y")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            use_original_geometric_error: std::env::var("TILES_ORIGINAL_GEOMETRIC_ERROR")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            request_timeout_secs: std::env::var("TILES_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .unwrap_or(60),
        }
    }

    pub fn tileset_options(&self) -> TilesetOptions {
        TilesetOptions {
            flip_y: self.flip_y,
            use_original_geometric_error: self.use_original_geometric_error,
            ..TilesetOptions::named(self.name.clone())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn test_tileset_options() {
        let config = Config {
            cache_dir: PathBuf::from("/tmp/tiles"),
            name: "city".into(),
            flip_y: true,
            use_original_geometric_error: false,
            request_timeout_secs: 5,
        };
        let options = config.tileset_options();
        assert_eq!(options.name, "city");
        assert!(options.flip_y);
        assert!(!options.use_original_geometric_error);
    }
}
