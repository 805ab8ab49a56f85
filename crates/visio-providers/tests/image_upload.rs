//! Local image uploads against mock hosting endpoints

use serde_json::json;
use tempfile::TempDir;
use visio_providers::{
    read_local_image, upload_image, HostedImageUploader, ImageUploader, ProviderError,
    SecretString,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0, 0];

fn write_png(dir: &TempDir) -> String {
    let path = dir.path().join("photo.png");
    std::fs::write(&path, PNG_HEADER).unwrap();
    path.to_str().unwrap().to_string()
}

fn uploader(server: &MockServer) -> HostedImageUploader {
    HostedImageUploader::new()
        .unwrap()
        .with_thumbsnap_url(format!("{}/api/upload", server.uri()))
        .with_quax_url(format!("{}/upload.php", server.uri()))
}

#[tokio::test]
async fn thumbsnap_upload_returns_thumb_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"media\"; filename=\"photo.png\""))
        .and(body_string_contains("thumb-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "abc", "thumb": "https://thumbsnap.com/t/abc.png"},
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = uploader(&server).with_thumbsnap_key(SecretString::from("thumb-key"));
    let url = upload_image(&write_png(&dir), &uploader).await.unwrap();
    assert_eq!(url, "https://thumbsnap.com/t/abc.png");
}

#[tokio::test]
async fn thumbsnap_failure_falls_back_to_quax() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload.php"))
        .and(body_string_contains("name=\"files[]\""))
        .and(body_string_contains("name=\"expiry\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "files": [{"url": "https://qu.ax/xyz.png"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = uploader(&server).with_thumbsnap_key(SecretString::from("thumb-key"));
    let url = upload_image(&write_png(&dir), &uploader).await.unwrap();
    assert_eq!(url, "https://qu.ax/xyz.png");
}

#[tokio::test]
async fn without_thumbsnap_key_only_quax_is_tried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "files": [{"url": "https://qu.ax/only.png"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let image = read_local_image(&write_png(&dir)).await.unwrap();
    let url = uploader(&server).upload(&image).await.unwrap();
    assert_eq!(url, "https://qu.ax/only.png");
}

#[tokio::test]
async fn both_hosts_failing_is_an_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uploader = uploader(&server).with_thumbsnap_key(SecretString::from("thumb-key"));
    let err = upload_image(&write_png(&dir), &uploader).await.unwrap_err();
    assert!(matches!(err, ProviderError::UploadFailed(_)));
    let message = err.to_string();
    assert!(message.contains("Thumbsnap"));
    assert!(message.contains("qu.ax"));
}

#[tokio::test]
async fn invalid_file_is_rejected_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"plain text").unwrap();

    let err = upload_image(path.to_str().unwrap(), &uploader(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidImage(_)));
}
