use anyhow::{anyhow, Result};
use reqwest::{Client, Method};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{ConnectionCheck, NextcloudCredentials, Photo, RemoteFile};
use crate::webdav_xml::parse_multistatus;

const PROPFIND_BODY: &str = r#"<?xml version="1.0"?>
    <d:propfind xmlns:d="DAV:">
        <d:prop>
            <d:displayname/>
            <d:getcontentlength/>
            <d:getlastmodified/>
            <d:getcontenttype/>
            <d:getetag/>
            <d:resourcetype/>
        </d:prop>
    </d:propfind>"#;

#[derive(Clone)]
pub struct WebDAVService {
    client: Client,
    credentials: NextcloudCredentials,
    base_webdav_url: String,
    image_extensions: Vec<String>,
}

impl WebDAVService {
    pub fn new(
        credentials: NextcloudCredentials,
        timeout_seconds: u64,
        image_extensions: Vec<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        if credentials.server.trim().is_empty() {
            return Err(anyhow!("Nextcloud configuration error: server URL is empty"));
        }

        if !credentials.server.starts_with("http://") && !credentials.server.starts_with("https://")
        {
            return Err(anyhow!(
                "Nextcloud configuration error: server URL must start with 'http://' or \
                 'https://'. Current value: '{}'. Example: https://cloud.example.com",
                credentials.server
            ));
        }

        if let Err(e) = reqwest::Url::parse(&credentials.server) {
            return Err(anyhow!(
                "Nextcloud configuration error: server URL is not a valid URL: {}. \
                 Current value: '{}'. The URL must be absolute, like https://cloud.example.com",
                e,
                credentials.server
            ));
        }

        // Nextcloud keeps per-user files under remote.php/dav/files/<user>
        let base_webdav_url = format!(
            "{}/remote.php/dav/files/{}",
            credentials.server.trim_end_matches('/'),
            credentials.username
        );
        debug!("Constructed WebDAV base URL: {}", base_webdav_url);

        Ok(Self {
            client,
            credentials,
            base_webdav_url,
            image_extensions,
        })
    }

    /// PROPFIND Depth 0 against the user's WebDAV root. HTTP-level failures
    /// come back as an unsuccessful `ConnectionCheck`, not an `Err`.
    pub async fn test_connection(&self) -> Result<ConnectionCheck> {
        let test_url = format!("{}/", self.base_webdav_url);
        info!("Testing WebDAV connection to {}", self.credentials.server);

        let response = self
            .client
            .request(Method::from_bytes(b"PROPFIND")?, &test_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Depth", "0")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "WebDAV request failed for '{}': {}. Verify the server URL is correct and \
                     reachable.",
                    test_url,
                    e
                )
            })?;

        if response.status().is_success() {
            info!("WebDAV connection successful");
            let server_version = self.probe_server_version().await;
            Ok(ConnectionCheck {
                success: true,
                message: "Successfully connected to Nextcloud".to_string(),
                server_version,
            })
        } else {
            Ok(ConnectionCheck {
                success: false,
                message: format!("Connection failed: HTTP {} for {}", response.status(), test_url),
                server_version: None,
            })
        }
    }

    /// Best effort version lookup via the capabilities endpoint.
    async fn probe_server_version(&self) -> Option<String> {
        let capabilities_url = format!(
            "{}/ocs/v1.php/cloud/capabilities?format=json",
            self.credentials.server.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&capabilities_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body: serde_json::Value = response.json().await.ok()?;
        body.pointer("/ocs/data/version/string")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Lists the immediate contents of a remote folder (PROPFIND Depth 1).
    /// Subdirectories are returned flagged; the folder itself is skipped.
    pub async fn list_directory(&self, folder: &str) -> Result<Vec<RemoteFile>> {
        let folder_url = format!(
            "{}/{}",
            self.base_webdav_url,
            folder.trim_matches('/')
        );
        debug!("Listing directory: {}", folder_url);

        let response = self
            .client
            .request(Method::from_bytes(b"PROPFIND")?, &folder_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("PROPFIND request failed: {}", response.status()));
        }

        let body = response.text().await?;
        let requested_path = reqwest::Url::parse(&folder_url)?
            .path()
            .trim_end_matches('/')
            .to_string();

        let mut entries = parse_multistatus(&body)?;
        // Depth 1 responses include the requested collection itself
        entries.retain(|e| e.path.trim_end_matches('/') != requested_path);
        Ok(entries)
    }

    /// Lists the photos in a remote folder as displayable URIs.
    pub async fn list_photos(&self, folder: &str) -> Result<Vec<Photo>> {
        let entries = self.list_directory(folder).await?;
        let server = self.credentials.server.trim_end_matches('/');

        let photos: Vec<Photo> = entries
            .iter()
            .filter(|e| !e.is_directory && self.is_image(e))
            .map(|e| Photo {
                uri: normalize_url(&format!("{}{}", server, e.path)),
            })
            .collect();

        debug!("Found {} photos in {}", photos.len(), folder);
        Ok(photos)
    }

    fn is_image(&self, file: &RemoteFile) -> bool {
        if file.mime_type.starts_with("image/") {
            return true;
        }
        // Some servers omit getcontenttype; fall back to the extension
        if file.mime_type.is_empty() || file.mime_type == "application/octet-stream" {
            if let Some(ext) = Path::new(&file.name).extension().and_then(|e| e.to_str()) {
                return self.image_extensions.contains(&ext.to_lowercase());
            }
        }
        false
    }

    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>> {
        // hrefs from PROPFIND are absolute WebDAV paths and already encoded
        let file_url = if file_path.starts_with("/remote.php/dav/") {
            format!(
                "{}{}",
                self.credentials.server.trim_end_matches('/'),
                file_path
            )
        } else {
            format!("{}/{}", self.base_webdav_url, file_path.trim_start_matches('/'))
        };
        debug!("Downloading file: {}", file_url);

        let response = self
            .client
            .get(&file_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("File download failed: {}", response.status()));
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    /// Downloads a photo previously returned by `list_photos`.
    pub async fn download_photo(&self, photo: &Photo) -> Result<Vec<u8>> {
        let server = self.credentials.server.trim_end_matches('/');
        let path = photo
            .uri
            .strip_prefix(server)
            .ok_or_else(|| anyhow!("Photo URI does not belong to this server: {}", photo.uri))?;
        self.download_file(path).await
    }

    pub async fn upload_file(&self, folder: &str, filename: &str, data: Vec<u8>) -> Result<()> {
        let remote_url = format!(
            "{}/{}/{}",
            self.base_webdav_url,
            folder.trim_matches('/'),
            urlencoding::encode(filename)
        );
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        debug!("Uploading {} bytes to {}", data.len(), remote_url);

        let response = self
            .client
            .put(&remote_url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Content-Type", mime.essence_str())
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("File upload failed: {}", response.status()));
        }

        info!("Uploaded {} to {}", filename, folder);
        Ok(())
    }
}

/// Collapses runs of slashes in the path portion of a URL, leaving the
/// scheme separator alone.
pub fn normalize_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let mut collapsed = String::with_capacity(rest.len());
            let mut prev_slash = false;
            for c in rest.chars() {
                if c == '/' {
                    if prev_slash {
                        continue;
                    }
                    prev_slash = true;
                } else {
                    prev_slash = false;
                }
                collapsed.push(c);
            }
            format!("{}://{}", scheme, collapsed)
        }
        None => url.to_string(),
    }
}
