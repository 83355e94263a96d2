// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tiles_lite_cache::{CacheConfig, CacheManager, Error, Fetcher, Result};
use url::Url;

/// Serves every URL with its own text as content.
struct EchoFetcher {
    staging: PathBuf,
    calls: AtomicUsize,
}

impl EchoFetcher {
    fn new(staging: &Path) -> Arc<Self> {
        Arc::new(Self {
            staging: staging.to_path_buf(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for EchoFetcher {
    fn fetch(&self, url: &Url) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tmp = tempfile::NamedTempFile::new_in(&self.staging).map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(tmp.path(), url.as_str()).map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let (_, path) = tmp.keep().map_err(|e| Error::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}

fn setup() -> (tempfile::TempDir, Arc<EchoFetcher>, CacheManager) {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir(&staging).unwrap();
    let fetcher = EchoFetcher::new(&staging);
    let manager = CacheManager::new(CacheConfig::new(dir.path().join("cache")), fetcher.clone());
    (dir, fetcher, manager)
}

#[test]
fn test_b3dm_is_cached_once() {
    let (_dir, fetcher, manager) = setup();
    let url = "https://tiles.example.com/city/tiles/3.b3dm";

    let first = manager.retrieve(url, "city").unwrap();
    assert_eq!(first, manager.cache_path("city", "3.b3dm"));
    assert_eq!(std::fs::read_to_string(&first).unwrap(), url);
    assert_eq!(fetcher.calls(), 1);

    let second = manager.retrieve(url, "city").unwrap();
    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_tileset_documents_are_not_cached() {
    let (_dir, fetcher, manager) = setup();
    let url = "https://tiles.example.com/city/tileset.json";

    let a = manager.retrieve(url, "city").unwrap();
    let b = manager.retrieve(url, "city").unwrap();
    assert_ne!(a, b);
    assert_eq!(fetcher.calls(), 2);
    assert!(!manager.cache_path("city", "tileset.json").exists());
    assert_eq!(std::fs::read_to_string(&b).unwrap(), url);
}

#[test]
fn test_concurrent_directory_creation() {
    let (_dir, _fetcher, manager) = setup();
    let results: Vec<_> = (0..32)
        .into_par_iter()
        .map(|_| manager.create_cache_directories("city", "0.b3dm"))
        .collect();
    for r in results {
        assert_eq!(r.unwrap(), manager.cache_directory("city", "0.b3dm"));
    }
}

#[test]
fn test_concurrent_retrieval_of_same_tile() {
    let (_dir, _fetcher, manager) = setup();
    let url = "https://tiles.example.com/city/tiles/9.b3dm";
    let paths: Vec<PathBuf> = (0..16)
        .into_par_iter()
        .map(|_| manager.retrieve(url, "city").unwrap())
        .collect();
    assert!(paths.iter().all(|p| *p == manager.cache_path("city", "9.b3dm")));
    assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), url);
}

#[test]
fn test_blocked_cache_directory() {
    let (dir, _fetcher, manager) = setup();
    std::fs::create_dir_all(dir.path().join("cache")).unwrap();
    // A plain file where the namespace directory should go.
    std::fs::write(dir.path().join("cache").join("city"), b"").unwrap();

    let err = manager
        .retrieve("https://tiles.example.com/city/tiles/1.b3dm", "city")
        .unwrap_err();
    match err {
        Error::CacheDirectory { path, .. } => assert_eq!(path, dir.path().join("cache").join("city")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(staged_files(dir.path()).is_empty());
}

fn staged_files(root: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(root.join("staging"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[test]
fn test_read_removes_staged_download() {
    let (dir, fetcher, manager) = setup();
    let url = "https://tiles.example.com/city/tileset.json";

    for _ in 0..3 {
        assert_eq!(manager.read(url, "city").unwrap(), url.as_bytes());
    }
    assert_eq!(fetcher.calls(), 3);
    assert!(staged_files(dir.path()).is_empty());
}

#[test]
fn test_read_keeps_cached_payload() {
    let (dir, fetcher, manager) = setup();
    let url = "https://tiles.example.com/city/tiles/4.b3dm";

    assert_eq!(manager.read(url, "city").unwrap(), url.as_bytes());
    assert_eq!(manager.read(url, "city").unwrap(), url.as_bytes());
    assert_eq!(fetcher.calls(), 1);
    assert!(manager.cache_path("city", "4.b3dm").exists());
    assert!(staged_files(dir.path()).is_empty());
}

#[test]
fn test_payload_staged_on_separate_directory_is_complete() {
    // Prefer a tmpfs staging area so the cache store crosses filesystems.
    let shm = Path::new("/dev/shm");
    let staging = if shm.is_dir() {
        tempfile::tempdir_in(shm).unwrap()
    } else {
        tempfile::tempdir().unwrap()
    };
    let cache = tempfile::tempdir().unwrap();
    let fetcher = EchoFetcher::new(staging.path());
    let manager = CacheManager::new(CacheConfig::new(cache.path()), fetcher.clone());
    let url = "https://tiles.example.com/city/tiles/5.b3dm";

    let path = manager.retrieve(url, "city").unwrap();
    assert_eq!(path, manager.cache_path("city", "5.b3dm"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), url);
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    assert_eq!(
        std::fs::read_dir(manager.cache_directory("city", "5.b3dm")).unwrap().count(),
        1
    );
}
