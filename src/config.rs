use anyhow::Result;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: String,
    pub cache_dir: String,
    pub photos_folder: String,
    pub timeout_seconds: u64,
    pub image_extensions: Vec<String>,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = env::var("FOTODAV_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        Ok(Config {
            cache_dir: env::var("FOTODAV_CACHE_DIR").unwrap_or_else(|_| "./cache".to_string()),
            photos_folder: env::var("FOTODAV_PHOTOS_FOLDER")
                .unwrap_or_else(|_| "/Photos".to_string()),
            timeout_seconds: env::var("FOTODAV_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            image_extensions: env::var("FOTODAV_IMAGE_EXTENSIONS")
                .unwrap_or_else(|_| "jpg,jpeg,png,gif,webp,heic,bmp".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| format!("sqlite://{}/photos.db", data_dir)),
            data_dir,
        })
    }
}
