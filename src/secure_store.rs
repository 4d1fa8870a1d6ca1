use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const CREDENTIALS_KEY: &str = "nextcloud-credentials";

/// One JSON blob per key, written under the data directory. Stands in for
/// the platform keychain on headless installs.
#[derive(Clone)]
pub struct SecureStore {
    root: PathBuf,
}

impl SecureStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().to_path_buf(),
        }
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("Error saving '{}' to store", key))?;
        debug!("Saved store key '{}'", key);
        Ok(())
    }

    /// A missing key is `None`; a blob that no longer deserializes is an error.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.key_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Error reading '{}' from store", key))
            }
        };

        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("Stored value for '{}' is not valid JSON", key))?;
        Ok(Some(value))
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Error deleting '{}' from store", key)),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}
