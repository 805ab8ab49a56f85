//! Client traits

use async_trait::async_trait;
use visio_protocol::{Completion, ContextEntry, ImageDescription, ModelParameters, Provider};

use crate::ProviderError;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Question asked when an image is sent without text
pub const DEFAULT_VISION_QUESTION: &str = "What is inside this image? Describe it in detail.";

/// Number of trailing history entries forwarded with an image question
pub const VISION_HISTORY_LEN: usize = 5;

/// Text completion over an ordered context
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Submit the context and return the reply text with token usage
    async fn submit(
        &self,
        context: &[ContextEntry],
        params: &ModelParameters,
    ) -> ProviderResult<Completion>;

    fn provider(&self) -> Provider;
}

/// Image description with a short conversation hint
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Describe the image at `image_url`.
    ///
    /// `history` is the recent conversation; implementations forward at most
    /// [`VISION_HISTORY_LEN`] entries of it.
    async fn analyze_image(
        &self,
        image_url: &str,
        question: &str,
        history: &[ContextEntry],
    ) -> ProviderResult<ImageDescription>;
}

/// The trailing slice of `history` forwarded with a vision request
pub(crate) fn recent_history(history: &[ContextEntry]) -> &[ContextEntry] {
    &history[history.len().saturating_sub(VISION_HISTORY_LEN)..]
}

pub(crate) fn question_or_default(question: &str) -> &str {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        DEFAULT_VISION_QUESTION
    } else {
        trimmed
    }
}
