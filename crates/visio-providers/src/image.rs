use base64::Engine;
use std::path::Path;

use crate::ProviderError;

/// Largest local image accepted for upload
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A validated local image file
#[derive(Debug, Clone)]
pub struct LocalImage {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl LocalImage {
    pub fn to_data_url(&self) -> String {
        let data = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.media_type, data)
    }
}

/// Read a local image, checking it against [`MAX_IMAGE_BYTES`] and the
/// supported formats.
pub async fn read_local_image(path: &str) -> Result<LocalImage, ProviderError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|err| {
        ProviderError::InvalidImage(format!("failed to read '{}': {}", path, err))
    })?;

    if metadata.len() > MAX_IMAGE_BYTES {
        return Err(ProviderError::InvalidImage(format!(
            "'{}' is {} bytes; the limit is {} bytes",
            path,
            metadata.len(),
            MAX_IMAGE_BYTES
        )));
    }

    let bytes = tokio::fs::read(path).await.map_err(|err| {
        ProviderError::InvalidImage(format!("failed to read '{}': {}", path, err))
    })?;

    let media_type = detect_media_type(path, &bytes).ok_or_else(|| {
        ProviderError::InvalidImage(format!(
            "unsupported image format for '{}'; supported formats: PNG, JPEG, GIF, WebP",
            path
        ))
    })?;

    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(LocalImage {
        file_name,
        media_type,
        bytes,
    })
}

/// Resolve an image argument into a URL a vision backend can fetch.
///
/// `http(s)://` and `data:` URLs are passed through untouched. Anything else is
/// read with [`read_local_image`] and inlined as a base64 data URL, which only
/// OpenAI-compatible backends accept. Use [`crate::upload_image`] for relays.
pub async fn load_image_url(path_or_url: &str) -> Result<String, ProviderError> {
    if is_remote(path_or_url) {
        return Ok(path_or_url.to_string());
    }

    let image = read_local_image(path_or_url).await?;
    tracing::debug!(
        path = path_or_url,
        media_type = image.media_type,
        bytes = image.bytes.len(),
        "inlined image"
    );
    Ok(image.to_data_url())
}

pub(crate) fn is_remote(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with("data:")
}

fn detect_media_type(path: &str, bytes: &[u8]) -> Option<&'static str> {
    media_type_from_extension(path).or_else(|| media_type_from_header(bytes))
}

fn media_type_from_extension(path: &str) -> Option<&'static str> {
    let ext = Path::new(path)
        .extension()
        .and_then(|v| v.to_str())?
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn media_type_from_header(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']) {
        return Some("image/png");
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    None
}
