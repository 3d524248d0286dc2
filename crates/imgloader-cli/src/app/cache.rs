//! Content-addressed image cache backed by a directory and an HTTP client.
//!
//! Images live at `{directory}/{sha256(uri)}.img`, written through a temp file
//! and renamed into place. Decoded dimensions of warmed images are kept in
//! memory for the lifetime of the cache.

use super::{config::CacheConfig, image::read_dimensions};
use imgloader::{BoxError, DecodedHandle, ImageCache};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} fetching {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug)]
pub struct DiskImageCache {
    client: reqwest::Client,
    directory: PathBuf,
    warm: Mutex<HashMap<String, DecodedHandle>>,
    temp_seq: AtomicU64,
}

impl DiskImageCache {
    /// Creates the cache directory if needed and builds the HTTP client.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&config.directory).await?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(CacheError::Client)?;

        Ok(Self {
            client,
            directory: config.directory,
            warm: Mutex::new(HashMap::new()),
            temp_seq: AtomicU64::new(0),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Where the encoded image for `uri` is persisted.
    pub fn key_path(&self, uri: &Url) -> PathBuf {
        let digest = Sha256::digest(uri.as_str().as_bytes());
        self.directory.join(format!("{digest:x}.img"))
    }

    /// Makes sure `uri` is cached. `warm` also decodes it into memory;
    /// `persist` also makes sure it is on disk, while `persist = false` keeps
    /// a fresh fetch off the disk.
    pub async fn prefetch(&self, uri: &Url, warm: bool, persist: bool) -> Result<(), CacheError> {
        let warmed = self.warm_handle(uri).is_some();
        let on_disk = tokio::fs::try_exists(self.key_path(uri)).await?;

        let satisfied = match (warm, persist) {
            (true, true) => warmed && on_disk,
            (true, false) => warmed,
            (false, true) => on_disk,
            (false, false) => warmed || on_disk,
        };
        if satisfied {
            return Ok(());
        }

        let bytes = self.load(uri, persist).await?;
        if warm && !warmed {
            self.decode(uri, &bytes)?;
        }
        Ok(())
    }

    /// Makes sure `uri` is cached and returns its decoded dimensions.
    pub async fn decoded(&self, uri: &Url, persist: bool) -> Result<DecodedHandle, CacheError> {
        if let Some(handle) = self.warm_handle(uri) {
            if !persist || tokio::fs::try_exists(self.key_path(uri)).await? {
                return Ok(handle);
            }
            self.load(uri, true).await?;
            return Ok(handle);
        }

        let bytes = self.load(uri, persist).await?;
        self.decode(uri, &bytes)
    }

    fn warm_handle(&self, uri: &Url) -> Option<DecodedHandle> {
        self.warm.lock().get(uri.as_str()).copied()
    }

    fn decode(&self, uri: &Url, bytes: &[u8]) -> Result<DecodedHandle, CacheError> {
        let (width, height) = read_dimensions(bytes)?;
        let handle = DecodedHandle { width, height };
        self.warm.lock().insert(uri.as_str().to_owned(), handle);
        Ok(handle)
    }

    /// Reads the encoded image from disk, or fetches it on a miss.
    async fn load(&self, uri: &Url, persist: bool) -> Result<Vec<u8>, CacheError> {
        let path = self.key_path(uri);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%uri, "disk cache hit");
                return Ok(bytes);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let bytes = self.fetch(uri).await?;
        if persist {
            self.store(&path, &bytes).await?;
        }
        Ok(bytes)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(uri = %uri)))]
    async fn fetch(&self, uri: &Url) -> Result<Vec<u8>, CacheError> {
        let fetch_error = |source| CacheError::Fetch {
            url: uri.to_string(),
            source,
        };

        let response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(status = status.as_u16(), "image fetch failed");
            return Err(CacheError::Status {
                url: uri.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(fetch_error)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(bytes = body.len(), "image fetched");
        Ok(body.to_vec())
    }

    async fn store(&self, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
        // Concurrent fetches of one URI must not share a temp file.
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{seq}.tmp"));
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

impl ImageCache for DiskImageCache {
    async fn ensure_present(&self, uri: &Url, warm: bool, persist: bool) -> Result<(), BoxError> {
        Ok(self.prefetch(uri, warm, persist).await?)
    }

    async fn ensure_present_decoded(
        &self,
        uri: &Url,
        persist: bool,
    ) -> Result<DecodedHandle, BoxError> {
        Ok(self.decoded(uri, persist).await?)
    }
}
