use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::config::Config;
use crate::models::Photo;
use crate::photo_cache::PhotoCache;
use crate::secure_store::{SecureStore, CREDENTIALS_KEY};
use crate::webdav_service::WebDAVService;

/// Ties together the credential store, the WebDAV service and the image
/// cache, and holds the last successfully fetched photo list.
pub struct PhotoLibrary {
    config: Config,
    service: WebDAVService,
    cache: PhotoCache,
    photos: Vec<Photo>,
}

impl PhotoLibrary {
    /// Loads the stored credentials and builds the service. Fails with a
    /// readable message when no credentials have been saved yet.
    pub async fn initialize(config: Config) -> Result<Self> {
        let store = SecureStore::new(&config.data_dir);
        let credentials = store
            .load(CREDENTIALS_KEY)
            .await?
            .ok_or_else(|| anyhow!("No stored credentials found. Run `fotodav login` first."))?;

        let service = WebDAVService::new(
            credentials,
            config.timeout_seconds,
            config.image_extensions.clone(),
        )?;
        let cache = PhotoCache::new(&config.cache_dir);

        Ok(Self {
            config,
            service,
            cache,
            photos: Vec::new(),
        })
    }

    /// Fetches the folder listing. A successful fetch replaces the held
    /// list; a failed one leaves the previous list in place.
    pub async fn fetch_photos(&mut self, folder: Option<&str>) -> Result<&[Photo]> {
        let folder = folder.unwrap_or(&self.config.photos_folder).to_string();
        let photos = self.service.list_photos(&folder).await?;
        info!("Fetched {} photos from {}", photos.len(), folder);
        self.photos = photos;
        Ok(&self.photos)
    }

    /// Uploads a local file into the photos folder, then re-fetches so the
    /// held list reflects the upload.
    pub async fn upload_photo(&mut self, local_path: &Path, folder: Option<&str>) -> Result<()> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file name: {}", local_path.display()))?
            .to_string();
        let folder = folder.unwrap_or(&self.config.photos_folder).to_string();

        let data = fs::read(local_path).await?;
        self.service.upload_file(&folder, &filename, data).await?;
        self.fetch_photos(Some(&folder)).await?;
        Ok(())
    }

    /// Fetches the listing and fills the local cache, returning the cached
    /// paths in listing order.
    pub async fn sync(&mut self, folder: Option<&str>) -> Result<Vec<PathBuf>> {
        self.fetch_photos(folder).await?;
        self.cache.fetch_all(&self.service, &self.photos).await
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn service(&self) -> &WebDAVService {
        &self.service
    }

    pub fn cache(&self) -> &PhotoCache {
        &self.cache
    }
}
