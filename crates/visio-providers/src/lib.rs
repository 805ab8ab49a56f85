//! Visio Providers - Remote model clients
//!
//! Two wire styles are supported:
//! - OpenAI-compatible `POST /v1/chat/completions` (OpenAI, OpenRouter, custom)
//! - Relay gateways that take a flattened prompt as a query parameter
//!   (Resita, NekoLabs)
//!
//! Both implement [`CompletionClient`] and [`VisionClient`]. Local images
//! reach relays through an [`ImageUploader`]. Failures are reported as
//! [`ProviderError`]; nothing is retried.

mod client;
mod config;
mod error;
mod image;
mod openai;
mod relay;
mod response_handling;
mod traits;
mod upload;

pub use client::{ClientBuilder, ClientFactory};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use image::{
    load_image_url, read_local_image, LocalImage, MAX_IMAGE_BYTES, SUPPORTED_MEDIA_TYPES,
};
pub use openai::OpenAICompatibleClient;
pub use relay::{flatten_transcript, vision_prompt, RelayClient};
pub use secrecy::SecretString;
pub use traits::{
    CompletionClient, ProviderResult, VisionClient, DEFAULT_VISION_QUESTION, VISION_HISTORY_LEN,
};
pub use upload::{
    upload_image, HostedImageUploader, ImageUploader, QUAX_UPLOAD_URL, THUMBSNAP_UPLOAD_URL,
};
