// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tiles-Lite Inspector - walks a 3D Tiles dataset the way a renderer does.
//!
//! # Commands
//!
//! - `tree <LOCATION>` - print chunk nodes from the root down
//! - `find <LOCATION> <LEVEL> <X> <Y> <Z>` - resolve one chunk id
//!
//! Configuration comes from `TILES_*` environment variables and can be
//! overridden per run with flags.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tiles_lite_cache::{CacheConfig, CacheManager, HttpFetcher};
use tiles_lite_engine::{ChunkLoaderFactory, ChunkNodeId, TileTree};
use tiles_lite_geometry::{CoordinateTransform, Crs};

mod config;
mod report;

use config::Config;
use report::NodeReport;

#[derive(Parser)]
#[command(name = "tiles-inspect")]
#[command(about = "Inspect 3D Tiles datasets", version)]
struct Cli {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct DatasetArgs {
    /// Cache namespace (defaults to TILES_NAME)
    #[arg(long, global = true)]
    name: Option<String>,

    /// Cache root (defaults to TILES_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Report bounding boxes Y-up
    #[arg(long, global = true)]
    flip_y: bool,

    /// Report declared geometric errors instead of depth-scaled ones
    #[arg(long, global = true)]
    original_geometric_error: bool,

    /// Reproject bounding boxes to this CRS, e.g. EPSG:3857
    #[arg(long, global = true)]
    crs: Option<String>,

    /// Print one JSON object per node
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print chunk nodes from the root down
    Tree {
        /// Tileset URL or path
        location: String,
        /// Deepest level to expand
        #[arg(long, default_value = "3")]
        max_depth: u32,
        /// Fetch and decode b3dm content of every printed node
        #[arg(long)]
        load_content: bool,
    },

    /// Resolve a chunk id to a tile
    Find {
        /// Tileset URL or path
        location: String,
        level: u32,
        #[arg(allow_hyphen_values = true)]
        x: i64,
        #[arg(allow_hyphen_values = true)]
        y: i64,
        #[arg(allow_hyphen_values = true)]
        z: i64,
    },
}

impl DatasetArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        config.flip_y |= self.flip_y;
        config.use_original_geometric_error |= self.original_geometric_error;
        config
    }

    fn transform(&self) -> Result<Option<CoordinateTransform>> {
        let Some(authid) = &self.crs else {
            return Ok(None);
        };
        let Some(target) = Crs::from_authid(authid) else {
            bail!("unsupported CRS {authid}");
        };
        Ok(Some(CoordinateTransform::new(Crs::Ecef, target)))
    }
}

fn emit(report: &NodeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!("{}", report.line());
    }
    Ok(())
}

fn print_tree(factory: &ChunkLoaderFactory<'_>, max_depth: u32, load_content: bool, json: bool) -> Result<()> {
    let mut queue = VecDeque::from([factory.create_root_node()]);
    let mut printed = 0usize;
    while let Some(node) = queue.pop_front() {
        let mut report = NodeReport::new(&node);
        if load_content && node.has_content {
            if let Err(e) = report.load_content(factory, &node) {
                tracing::warn!(id = %node.id, error = %e, "Failed to load content");
            }
        }
        emit(&report, json)?;
        printed += 1;

        if node.id.level >= max_depth {
            continue;
        }
        match factory.create_children(&node.id) {
            Ok(children) => queue.extend(children),
            Err(e) => tracing::warn!(id = %node.id, error = %e, "Failed to expand node"),
        }
    }
    tracing::info!(
        nodes = printed,
        tiles = factory.tree().tile_count(),
        tilesets = factory.tree().tileset_count(),
        "Done"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tiles_lite_engine=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.dataset.apply(Config::from_env());
    let crs = cli.dataset.transform()?;

    tracing::info!(
        cache_dir = %config.cache_dir.display(),
        name = %config.name,
        flip_y = config.flip_y,
        "Starting Tiles-Lite Inspector"
    );

    // Stage downloads on the cache filesystem.
    let fetcher = HttpFetcher::new(Duration::from_secs(config.request_timeout_secs))
        .context("failed to build HTTP client")?
        .with_staging_dir(config.cache_dir.join(".staging"));
    let cache = Arc::new(CacheManager::new(
        CacheConfig::new(config.cache_dir.clone()),
        Arc::new(fetcher),
    ));

    match cli.command {
        Command::Tree {
            location,
            max_depth,
            load_content,
        } => {
            let tree = TileTree::open(&location, config.tileset_options(), cache)
                .with_context(|| format!("failed to open {location}"))?;
            let factory = ChunkLoaderFactory::new(&tree, crs);
            print_tree(&factory, max_depth, load_content, cli.dataset.json)?;
        }
        Command::Find {
            location,
            level,
            x,
            y,
            z,
        } => {
            let tree = TileTree::open(&location, config.tileset_options(), cache)
                .with_context(|| format!("failed to open {location}"))?;
            let factory = ChunkLoaderFactory::new(&tree, crs);
            let id = ChunkNodeId::new(level, x, y, z);
            let Some(tile) = factory.find_tile(&id)? else {
                bail!("no tile for chunk id {id}");
            };
            let parent = tile.parent().map(|p| factory.tree().tileset().tile_id(&p, factory.crs()));
            let node = factory.chunk_node(&tile, parent);
            emit(&NodeReport::new(&node), cli.dataset.json)?;
        }
    }
    Ok(())
}
