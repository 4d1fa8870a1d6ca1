use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::models::FavoritePhoto;

const FAVORITES_FILE: &str = "favorites.json";

/// Favorites persisted as a flat JSON list. Writes rewrite the whole file,
/// last write wins.
#[derive(Clone)]
pub struct FavoritesStore {
    path: PathBuf,
}

impl FavoritesStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(FAVORITES_FILE),
        }
    }

    pub async fn list(&self) -> Result<Vec<FavoritePhoto>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Error loading favorite photos"),
        };

        serde_json::from_slice(&bytes).context("Favorites file is not valid JSON")
    }

    /// Adding an already-favorited uri is a no-op that returns the
    /// existing entry.
    pub async fn add(&self, uri: &str) -> Result<FavoritePhoto> {
        let mut favorites = self.list().await?;

        if let Some(existing) = favorites.iter().find(|f| f.uri == uri) {
            return Ok(existing.clone());
        }

        let favorite = FavoritePhoto {
            id: Uuid::new_v4(),
            uri: uri.to_string(),
        };
        favorites.push(favorite.clone());
        self.save(&favorites).await?;
        Ok(favorite)
    }

    /// Returns whether anything was removed.
    pub async fn remove(&self, uri: &str) -> Result<bool> {
        let mut favorites = self.list().await?;
        let before = favorites.len();
        favorites.retain(|f| f.uri != uri);

        if favorites.len() == before {
            return Ok(false);
        }

        self.save(&favorites).await?;
        Ok(true)
    }

    async fn save(&self, favorites: &[FavoritePhoto]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(favorites)?;
        fs::write(&self.path, json)
            .await
            .context("Error saving favorite photos")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_then_list_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path());

        store
            .add("https://cloud.example.com/remote.php/dav/files/alice/Photos/a.jpg")
            .await
            .unwrap();
        store
            .add("https://cloud.example.com/remote.php/dav/files/alice/Photos/b.jpg")
            .await
            .unwrap();

        // fresh store over the same file
        let reloaded = FavoritesStore::new(dir.path());
        let favorites = reloaded.list().await.unwrap();
        assert_eq!(favorites.len(), 2);
        assert!(favorites.iter().any(|f| f.uri.ends_with("/a.jpg")));
    }

    #[tokio::test]
    async fn add_is_idempotent_per_uri() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path());

        let first = store.add("uri://one").await.unwrap();
        let second = store.add("uri://one").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_absent_uri_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::new(dir.path());

        store.add("uri://keep").await.unwrap();
        assert!(!store.remove("uri://missing").await.unwrap());
        assert!(store.remove("uri://keep").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }
}
