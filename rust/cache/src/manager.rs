// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Content retrieval with an on-disk cache for tile payloads.
//!
//! Layout: `{cache_dir}/{namespace}/{file_name}/{file_name}`. Only `.b3dm`
//! payloads are cached; tileset documents are fetched on every request so
//! that a refreshed dataset is picked up.

use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the cache tree.
    pub cache_dir: PathBuf,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

/// Maps remote URLs to local files, fetching and caching as needed.
///
/// Holds no mutable state; share it across threads behind an `Arc`.
#[derive(Clone)]
pub struct CacheManager {
    config: CacheConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("cache_dir", &self.config.cache_dir)
            .finish_non_exhaustive()
    }
}

/// Last path segment of a URL, `"index"` when the path ends with `/`.
fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("index")
        .to_string()
}

/// `create_dir` that treats a directory created concurrently as success.
fn create_dir_tolerant(path: &Path) -> Result<()> {
    match std::fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(Error::CacheDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Move `from` to `to`. When a rename is not possible (the staging area is
/// on another filesystem) the bytes are copied into a temporary file in
/// `dir` first and renamed into place, so `to` is never seen half-written.
fn store_file(from: &Path, dir: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_into_place(from, dir, to)
}

fn copy_into_place(from: &Path, dir: &Path, to: &Path) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::copy(&mut std::fs::File::open(from)?, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(to).map_err(|e| e.error)?;
    remove_staged(from);
    Ok(())
}

fn remove_staged(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged download");
    }
}

/// Where retrieved content lives.
enum Retrieved {
    /// A local file or a cached copy, owned by someone else.
    Kept(PathBuf),
    /// A fresh download the caller owns.
    Staged(PathBuf),
}

impl Retrieved {
    fn into_path(self) -> PathBuf {
        match self {
            Self::Kept(path) | Self::Staged(path) => path,
        }
    }
}

impl CacheManager {
    pub fn new(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Directory holding the cached copy of `file_name`.
    pub fn cache_directory(&self, namespace: &str, file_name: &str) -> PathBuf {
        self.config.cache_dir.join(namespace).join(file_name)
    }

    /// Path of the cached copy of `file_name`.
    pub fn cache_path(&self, namespace: &str, file_name: &str) -> PathBuf {
        self.cache_directory(namespace, file_name).join(file_name)
    }

    /// Create the cache root, the namespace directory and the per-file
    /// directory. Safe to call concurrently for the same path.
    pub fn create_cache_directories(&self, namespace: &str, file_name: &str) -> Result<PathBuf> {
        let root = &self.config.cache_dir;
        std::fs::create_dir_all(root).map_err(|source| Error::CacheDirectory {
            path: root.clone(),
            source,
        })?;
        let ns_dir = root.join(namespace);
        create_dir_tolerant(&ns_dir)?;
        let file_dir = ns_dir.join(file_name);
        create_dir_tolerant(&file_dir)?;
        Ok(file_dir)
    }

    /// Return a local path holding the content of `url`.
    ///
    /// Non-HTTP locations are returned as they are (`file://` URLs as their
    /// local path). Remote `.b3dm` payloads are served from the cache when
    /// present, and stored there after a fetch. Other remote files are
    /// fetched every time and the staged download is returned; the caller
    /// owns it. Use [`CacheManager::read`] to have it removed.
    pub fn retrieve(&self, url: &str, namespace: &str) -> Result<PathBuf> {
        Ok(self.locate(url, namespace)?.into_path())
    }

    /// Read the content of `url`. Staged downloads are removed afterwards.
    pub fn read(&self, url: &str, namespace: &str) -> Result<Vec<u8>> {
        match self.locate(url, namespace)? {
            Retrieved::Kept(path) => {
                std::fs::read(&path).map_err(|source| Error::Read { path, source })
            }
            Retrieved::Staged(path) => {
                let bytes = std::fs::read(&path);
                remove_staged(&path);
                bytes.map_err(|source| Error::Read { path, source })
            }
        }
    }

    fn locate(&self, url: &str, namespace: &str) -> Result<Retrieved> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(Retrieved::Kept(PathBuf::from(url))),
        };
        match parsed.scheme() {
            "http" | "https" => {}
            "file" => {
                return parsed
                    .to_file_path()
                    .map(Retrieved::Kept)
                    .map_err(|_| Error::InvalidUrl(url.to_string()));
            }
            _ => return Ok(Retrieved::Kept(PathBuf::from(url))),
        }

        let file_name = url_file_name(&parsed);
        let cacheable = file_name.ends_with(".b3dm");
        let cache_path = self.cache_path(namespace, &file_name);

        if cacheable && cache_path.exists() {
            tracing::debug!(url, path = %cache_path.display(), "Cache hit");
            return Ok(Retrieved::Kept(cache_path));
        }

        let fetched = self.fetcher.fetch(&parsed)?;
        if !cacheable {
            tracing::debug!(url, path = %fetched.display(), "Fetched uncached content");
            return Ok(Retrieved::Staged(fetched));
        }

        let file_dir = match self.create_cache_directories(namespace, &file_name) {
            Ok(dir) => dir,
            Err(e) => {
                remove_staged(&fetched);
                return Err(e);
            }
        };
        if let Err(source) = store_file(&fetched, &file_dir, &cache_path) {
            tracing::error!(url, path = %cache_path.display(), error = %source, "Unable to create cache file");
            if fetched.exists() {
                remove_staged(&fetched);
            }
            return Err(Error::CacheDirectory {
                path: cache_path,
                source,
            });
        }
        tracing::debug!(url, path = %cache_path.display(), "Cached");
        Ok(Retrieved::Kept(cache_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverFetch;

    impl Fetcher for NeverFetch {
        fn fetch(&self, url: &Url) -> Result<PathBuf> {
            Err(Error::FetchFailed {
                url: url.to_string(),
                reason: "offline".into(),
            })
        }
    }

    fn manager(root: &Path) -> CacheManager {
        CacheManager::new(CacheConfig::new(root), Arc::new(NeverFetch))
    }

    #[test]
    fn test_cache_path_layout() {
        let m = manager(Path::new("/var/cache/3dtiles"));
        assert_eq!(
            m.cache_path("city", "12.b3dm"),
            PathBuf::from("/var/cache/3dtiles/city/12.b3dm/12.b3dm")
        );
        assert_eq!(m.cache_path("city", "12.b3dm"), m.cache_path("city", "12.b3dm"));
    }

    #[test]
    fn test_url_file_name() {
        let u = Url::parse("https://host/a/b/7.b3dm?x=1").unwrap();
        assert_eq!(url_file_name(&u), "7.b3dm");
        let u = Url::parse("https://host/a/").unwrap();
        assert_eq!(url_file_name(&u), "index");
    }

    #[test]
    fn test_local_locations_pass_through() {
        let m = manager(Path::new("/nonexistent"));
        assert_eq!(m.retrieve("data/tileset.json", "ns").unwrap(), PathBuf::from("data/tileset.json"));
        assert_eq!(
            m.retrieve("/abs/tileset.json", "ns").unwrap(),
            PathBuf::from("/abs/tileset.json")
        );
        #[cfg(unix)]
        assert_eq!(
            m.retrieve("file:///abs/tile%201.b3dm", "ns").unwrap(),
            PathBuf::from("/abs/tile 1.b3dm")
        );
    }

    #[test]
    fn test_store_file_renames() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("staged");
        let to = dir.path().join("0.b3dm");
        std::fs::write(&from, b"new content").unwrap();

        store_file(&from, dir.path(), &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"new content");
        assert!(!from.exists());
    }

    #[test]
    fn test_copy_into_place_replaces_target_whole() {
        let staging = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let from = staging.path().join("staged");
        let to = cache.path().join("0.b3dm");
        std::fs::write(&from, vec![7u8; 64 * 1024]).unwrap();
        std::fs::write(&to, b"old").unwrap();

        copy_into_place(&from, cache.path(), &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), vec![7u8; 64 * 1024]);
        assert!(!from.exists());
        // Only the target remains; the intermediate file was renamed onto it.
        assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_store_file_missing_source_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_file(&dir.path().join("gone"), dir.path(), &dir.path().join("0.b3dm"));
        assert!(err.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_read_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tileset.json");
        std::fs::write(&path, b"{}").unwrap();
        let m = manager(Path::new("/nonexistent"));
        assert_eq!(m.read(path.to_str().unwrap(), "ns").unwrap(), b"{}");
        assert!(path.exists());
        let err = m.read(dir.path().join("missing.json").to_str().unwrap(), "ns").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let m = manager(Path::new("/nonexistent"));
        let err = m.retrieve("https://example.invalid/0.b3dm", "ns").unwrap_err();
        assert!(matches!(err, Error::FetchFailed { .. }));
    }
}
