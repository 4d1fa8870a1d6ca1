use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::models::Photo;
use crate::webdav_service::WebDAVService;

/// Flat on-disk image cache: one file per photo, keyed by the decoded last
/// segment of the photo URI. Existence check before each download, no
/// eviction and no size bound.
#[derive(Clone)]
pub struct PhotoCache {
    cache_dir: PathBuf,
}

impl PhotoCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    pub fn local_path(&self, photo: &Photo) -> Result<PathBuf> {
        let segment = photo
            .uri
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Photo URI has no file name: {}", photo.uri))?;

        let name = urlencoding::decode(segment)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| segment.to_string());
        // decoding can reintroduce separators; the name must stay a single
        // component under the cache dir
        if name.contains('/') || name.contains('\\') || name == ".." {
            return Err(anyhow!("Photo URI has an unsafe file name: {}", photo.uri));
        }
        Ok(self.cache_dir.join(name))
    }

    /// Returns the cached path, downloading the image first if it is not
    /// on disk yet.
    pub async fn fetch(&self, service: &WebDAVService, photo: &Photo) -> Result<PathBuf> {
        let path = self.local_path(photo)?;

        if fs::try_exists(&path).await? {
            debug!("Cache hit: {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).await?;
        let bytes = service.download_photo(photo).await?;
        fs::write(&path, &bytes).await?;
        debug!("Cached {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Sequentially caches every photo. Failed downloads are logged and
    /// skipped so one broken image does not empty the grid.
    pub async fn fetch_all(&self, service: &WebDAVService, photos: &[Photo]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(photos.len());

        for photo in photos {
            match self.fetch(service, photo).await {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Error caching image {}: {}", photo.uri, e),
            }
        }

        Ok(paths)
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.cache_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.cache_dir).await?;
        Ok(())
    }
}
