use fotodav::models::NextcloudCredentials;
use fotodav::webdav_service::WebDAVService;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_service(server_url: &str) -> WebDAVService {
    let credentials = NextcloudCredentials {
        server: server_url.to_string(),
        username: "testuser".to_string(),
        password: "testpass".to_string(),
    };
    WebDAVService::new(
        credentials,
        30,
        vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
    )
    .expect("Failed to create WebDAV service")
}

fn photos_multistatus() -> String {
    r#"<?xml version="1.0"?>
    <d:multistatus xmlns:d="DAV:">
        <d:response>
            <d:href>/remote.php/dav/files/testuser/Photos/</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>Photos</d:displayname>
                    <d:resourcetype><d:collection/></d:resourcetype>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>
        <d:response>
            <d:href>/remote.php/dav/files/testuser/Photos/sunset.jpg</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>sunset.jpg</d:displayname>
                    <d:getcontentlength>204800</d:getcontentlength>
                    <d:getcontenttype>image/jpeg</d:getcontenttype>
                    <d:getetag>"e1"</d:getetag>
                    <d:resourcetype/>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>
        <d:response>
            <d:href>/remote.php/dav/files/testuser/Photos/notes.txt</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>notes.txt</d:displayname>
                    <d:getcontentlength>64</d:getcontentlength>
                    <d:getcontenttype>text/plain</d:getcontenttype>
                    <d:resourcetype/>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>
        <d:response>
            <d:href>/remote.php/dav/files/testuser/Photos/Albums/</d:href>
            <d:propstat>
                <d:prop>
                    <d:displayname>Albums</d:displayname>
                    <d:resourcetype><d:collection/></d:resourcetype>
                </d:prop>
                <d:status>HTTP/1.1 200 OK</d:status>
            </d:propstat>
        </d:response>
    </d:multistatus>"#
        .to_string()
}

#[tokio::test]
async fn list_photos_returns_only_images_with_normalized_uris() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/files/testuser/Photos"))
        .and(header("Depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_string(photos_multistatus()))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let photos = service.list_photos("/Photos").await.unwrap();

    assert_eq!(photos.len(), 1);
    assert_eq!(
        photos[0].uri,
        format!(
            "{}/remote.php/dav/files/testuser/Photos/sunset.jpg",
            mock_server.uri()
        )
    );
}

#[tokio::test]
async fn list_directory_skips_the_requested_collection_itself() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/files/testuser/Photos"))
        .respond_with(ResponseTemplate::new(207).set_body_string(photos_multistatus()))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let entries = service.list_directory("/Photos").await.unwrap();

    // sunset.jpg, notes.txt and the Albums subdirectory, but not Photos itself
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.name != "Photos"));
    assert!(entries.iter().any(|e| e.name == "Albums" && e.is_directory));
}

#[tokio::test]
async fn list_directory_propagates_http_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let err = service.list_directory("/Photos").await.err().unwrap();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_connection_reports_success_and_version() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/files/testuser/"))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_string(photos_multistatus()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ocs/v1.php/cloud/capabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ocs": { "data": { "version": { "string": "29.0.1" } } }
        })))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let check = service.test_connection().await.unwrap();

    assert!(check.success);
    assert_eq!(check.server_version.as_deref(), Some("29.0.1"));
}

#[tokio::test]
async fn test_connection_surfaces_http_failure_as_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let check = service.test_connection().await.unwrap();

    assert!(!check.success);
    assert!(check.message.contains("401"));
    assert!(check.server_version.is_none());
}

#[tokio::test]
async fn upload_puts_file_bytes_with_guessed_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/files/testuser/Photos/fresh.jpg"))
        .and(header("Content-Type", "image/jpeg"))
        .and(body_string("fake image data"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    service
        .upload_file("/Photos", "fresh.jpg", b"fake image data".to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_failure_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let err = service
        .upload_file("/Photos", "big.jpg", vec![0u8; 16])
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("507"));
}

#[tokio::test]
async fn download_resolves_absolute_webdav_hrefs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/remote.php/dav/files/testuser/Photos/sunset.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server.uri());
    let bytes = service
        .download_file("/remote.php/dav/files/testuser/Photos/sunset.jpg")
        .await
        .unwrap();
    assert_eq!(bytes, b"jpeg bytes");
}
