use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat credentials record persisted as an opaque JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextcloudCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

/// A displayable remote photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub uri: String,
}

/// One entry from a PROPFIND multistatus response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub is_directory: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
    pub server_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritePhoto {
    pub id: Uuid,
    pub uri: String,
}
