//! Shared helpers for reading HTTP responses

use serde::Deserialize;

use crate::ProviderError;

const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

/// Extract retry-after delay from response headers, in milliseconds
pub(crate) fn extract_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

/// Map a non-success response to a provider error
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after_ms =
            extract_retry_after(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER_MS);
        return ProviderError::RateLimited { retry_after_ms };
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(body);

    ProviderError::InvalidResponse(format!("API error {}: {}", status, detail))
}

/// Error payload shapes used by OpenAI-style and relay backends
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: ErrorDetail },
    Flat {
        #[serde(alias = "error")]
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        let message = match self {
            ErrorBody::Nested { error } => error.message,
            ErrorBody::Flat { message } => message,
        };
        (!message.is_empty()).then_some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_extract_retry_after_present() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));
        assert_eq!(extract_retry_after(&headers), Some(30_000));
    }

    #[test]
    fn test_extract_retry_after_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(extract_retry_after(&headers), None);
    }

    #[test]
    fn test_error_body_shapes() {
        let nested: ErrorBody =
            serde_json::from_str(r#"{"error": {"message": "bad key", "type": "auth"}}"#).unwrap();
        assert_eq!(nested.into_message().as_deref(), Some("bad key"));

        let flat: ErrorBody =
            serde_json::from_str(r#"{"success": false, "message": "quota"}"#).unwrap();
        assert_eq!(flat.into_message().as_deref(), Some("quota"));

        let alias: ErrorBody = serde_json::from_str(r#"{"error": "down"}"#).unwrap();
        assert_eq!(alias.into_message().as_deref(), Some("down"));
    }
}
