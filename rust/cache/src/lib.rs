// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tiles-Lite Cache
//!
//! Resolves tile content URLs to local files. Remote b3dm payloads are
//! stored under a per-tileset namespace so that revisiting a dataset does
//! not hit the network again.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tiles_lite_cache::{CacheConfig, CacheManager, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(Duration::from_secs(60))?;
//! let cache = CacheManager::new(CacheConfig::new("/tmp/3dtiles"), Arc::new(fetcher));
//! let path = cache.retrieve("https://example.com/tiles/0.b3dm", "city")?;
//! ```

pub mod error;
pub mod fetcher;
pub mod manager;

pub use error::{Error, Result};
pub use fetcher::{Fetcher, HttpFetcher};
pub use manager::{CacheConfig, CacheManager};
