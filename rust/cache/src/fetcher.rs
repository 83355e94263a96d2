// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network primitive used by the cache.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Blocking fetch of a remote resource into a local file.
///
/// Implementations return the path of a file that outlives the call; the
/// caller takes ownership of it (moves it into the cache or reads it).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<PathBuf>;
}

/// [`Fetcher`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    staging_dir: Option<PathBuf>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::FetchFailed {
                url: String::new(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            staging_dir: None,
        })
    }

    /// Stage downloads in `dir` instead of the system temp directory. Putting
    /// it on the cache's filesystem lets cached files be moved by rename.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    fn fail(url: &Url, reason: impl ToString) -> Error {
        Error::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<PathBuf> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| Self::fail(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::fail(url, format!("HTTP status {status}")));
        }
        let body = response.bytes().map_err(|e| Self::fail(url, e))?;

        let mut tmp = match &self.staging_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| Self::fail(url, e))?;
                tempfile::NamedTempFile::new_in(dir)
            }
            None => tempfile::NamedTempFile::new(),
        }
        .map_err(|e| Self::fail(url, e))?;
        tmp.write_all(&body).map_err(|e| Self::fail(url, e))?;
        let (_, path) = tmp.keep().map_err(|e| Self::fail(url, e))?;

        tracing::debug!(url = %url, bytes = body.len(), path = %path.display(), "Fetched");
        Ok(path)
    }
}
