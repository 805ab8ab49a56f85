//! Provider configuration

use secrecy::SecretString;
use visio_protocol::Provider;

const RESITA_BASE_URL: &str = "https://api.ferdev.my.id";
const NEKOLABS_BASE_URL: &str = "https://api.nekolabs.my.id";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_VISION_TIMEOUT_SECS: u64 = 60;

/// Configuration for a model provider
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    /// Overrides the catalog model id sent on the wire
    pub model: Option<String>,
    /// Model used for image questions on OpenAI-compatible backends
    pub vision_model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub vision_timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Resita,
            api_key: None,
            base_url: None,
            model: None,
            vision_model: None,
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECS),
            vision_timeout_seconds: Some(DEFAULT_VISION_TIMEOUT_SECS),
        }
    }
}

impl ProviderConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn resita(api_key: impl Into<String>) -> Self {
        Self::new(Provider::Resita).with_api_key(api_key)
    }

    pub fn nekolabs() -> Self {
        Self::new(Provider::NekoLabs)
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(Provider::OpenAI).with_api_key(api_key)
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new(Provider::OpenRouter).with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_vision_timeout(mut self, seconds: u64) -> Self {
        self.vision_timeout_seconds = Some(seconds);
        self
    }

    /// Base URL without a trailing slash; `None` only for `Custom` without one
    pub fn resolved_base_url(&self) -> Option<String> {
        let url = match (&self.base_url, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, Provider::Resita) => RESITA_BASE_URL,
            (None, Provider::NekoLabs) => NEKOLABS_BASE_URL,
            (None, Provider::OpenAI) => OPENAI_BASE_URL,
            (None, Provider::OpenRouter) => OPENROUTER_BASE_URL,
            (None, Provider::Custom) => return None,
        };
        Some(url.trim_end_matches('/').to_string())
    }

    pub(crate) fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub(crate) fn vision_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.vision_timeout_seconds
                .unwrap_or(DEFAULT_VISION_TIMEOUT_SECS),
        )
    }
}
