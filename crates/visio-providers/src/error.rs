//! Provider error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limit exceeded: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("nothing to send: {0}")]
    EmptyRequest(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("image upload failed: {0}")]
    UploadFailed(String),

    #[error("model {model} is not served by {provider}")]
    UnsupportedModel { model: String, provider: String },
}

impl ProviderError {
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
