//! Image hosting
//!
//! Relay gateways only accept images by public URL, so local files are
//! uploaded first. Thumbsnap is tried when a key is configured, then qu.ax.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::image::{is_remote, read_local_image, LocalImage};
use crate::response_handling::error_from_response;
use crate::traits::ProviderResult;
use crate::ProviderError;

pub const THUMBSNAP_UPLOAD_URL: &str = "https://thumbsnap.com/api/upload";
pub const QUAX_UPLOAD_URL: &str = "https://qu.ax/upload.php";

/// Days qu.ax keeps an upload
const QUAX_EXPIRY_DAYS: &str = "30";
const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Turns a local image into a publicly reachable URL
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, image: &LocalImage) -> ProviderResult<String>;
}

/// Uploads to Thumbsnap, falling back to qu.ax
pub struct HostedImageUploader {
    client: Client,
    thumbsnap_url: String,
    thumbsnap_key: Option<SecretString>,
    quax_url: String,
}

impl HostedImageUploader {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            thumbsnap_url: THUMBSNAP_UPLOAD_URL.to_string(),
            thumbsnap_key: None,
            quax_url: QUAX_UPLOAD_URL.to_string(),
        })
    }

    pub fn with_thumbsnap_key(mut self, key: SecretString) -> Self {
        self.thumbsnap_key = Some(key);
        self
    }

    pub fn with_thumbsnap_url(mut self, url: impl Into<String>) -> Self {
        self.thumbsnap_url = url.into();
        self
    }

    pub fn with_quax_url(mut self, url: impl Into<String>) -> Self {
        self.quax_url = url.into();
        self
    }

    fn file_part(image: &LocalImage) -> ProviderResult<Part> {
        Ok(Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.media_type)?)
    }

    async fn upload_thumbsnap(
        &self,
        image: &LocalImage,
        key: &SecretString,
    ) -> ProviderResult<String> {
        let form = Form::new()
            .part("media", Self::file_part(image)?)
            .text("key", key.expose_secret().to_string());

        let response = self
            .client
            .post(&self.thumbsnap_url)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: ThumbsnapResponse = response.json().await?;
        body.data
            .and_then(|data| data.thumb)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Thumbsnap returned no image URL".into())
            })
    }

    async fn upload_quax(&self, image: &LocalImage) -> ProviderResult<String> {
        let form = Form::new()
            .part("files[]", Self::file_part(image)?)
            .text("expiry", QUAX_EXPIRY_DAYS);

        let response = self.client.post(&self.quax_url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: QuaxResponse = response.json().await?;
        if !body.success {
            return Err(ProviderError::InvalidResponse("qu.ax rejected the upload".into()));
        }
        body.files
            .into_iter()
            .next()
            .and_then(|file| file.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("qu.ax returned no image URL".into()))
    }
}

#[async_trait]
impl ImageUploader for HostedImageUploader {
    async fn upload(&self, image: &LocalImage) -> ProviderResult<String> {
        let thumbsnap_error = match &self.thumbsnap_key {
            Some(key) => match self.upload_thumbsnap(image, key).await {
                Ok(url) => {
                    tracing::debug!(file = %image.file_name, %url, "uploaded image to Thumbsnap");
                    return Ok(url);
                }
                Err(err) => {
                    tracing::warn!(file = %image.file_name, error = %err, "Thumbsnap upload failed");
                    err.to_string()
                }
            },
            None => "no Thumbsnap key configured".to_string(),
        };

        match self.upload_quax(image).await {
            Ok(url) => {
                tracing::debug!(file = %image.file_name, %url, "uploaded image to qu.ax");
                Ok(url)
            }
            Err(err) => Err(ProviderError::UploadFailed(format!(
                "Thumbsnap: {}; qu.ax: {}",
                thumbsnap_error, err
            ))),
        }
    }
}

/// Resolve an image argument into a public URL.
///
/// URLs are passed through; local files are validated and uploaded.
pub async fn upload_image(
    path_or_url: &str,
    uploader: &dyn ImageUploader,
) -> ProviderResult<String> {
    if is_remote(path_or_url) {
        return Ok(path_or_url.to_string());
    }

    let image = read_local_image(path_or_url).await?;
    uploader.upload(&image).await
}

#[derive(Debug, Deserialize)]
struct ThumbsnapResponse {
    data: Option<ThumbsnapData>,
}

#[derive(Debug, Deserialize)]
struct ThumbsnapData {
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuaxResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    files: Vec<QuaxFile>,
}

#[derive(Debug, Deserialize)]
struct QuaxFile {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbsnap_envelope() {
        let body: ThumbsnapResponse = serde_json::from_str(
            r#"{"data": {"id": "abc", "thumb": "https://thumbsnap.com/t/abc.png"}, "success": true}"#,
        )
        .unwrap();
        assert_eq!(
            body.data.and_then(|d| d.thumb).as_deref(),
            Some("https://thumbsnap.com/t/abc.png")
        );
    }

    #[test]
    fn test_quax_envelope() {
        let body: QuaxResponse = serde_json::from_str(
            r#"{"success": true, "files": [{"url": "https://qu.ax/xyz.png", "size": 10}]}"#,
        )
        .unwrap();
        assert!(body.success);
        assert_eq!(body.files[0].url.as_deref(), Some("https://qu.ax/xyz.png"));

        let failed: QuaxResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(failed.files.is_empty());
    }

    #[tokio::test]
    async fn test_remote_url_is_not_uploaded() {
        let uploader = HostedImageUploader::new()
            .unwrap()
            .with_quax_url("http://127.0.0.1:9/unreachable");
        let url = upload_image("https://example.com/cat.png", &uploader).await.unwrap();
        assert_eq!(url, "https://example.com/cat.png");
    }
}
