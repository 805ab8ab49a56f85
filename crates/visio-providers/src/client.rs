//! Client builder

use std::sync::Arc;
use visio_protocol::Provider;

use crate::traits::ProviderResult;
use crate::{
    CompletionClient, OpenAICompatibleClient, ProviderConfig, ProviderError, RelayClient,
    VisionClient,
};

/// Hands out the clients serving chats on a given provider
pub trait ClientFactory: Send + Sync {
    fn completion_for(&self, provider: Provider) -> ProviderResult<Arc<dyn CompletionClient>>;

    fn vision_for(&self, provider: Provider) -> ProviderResult<Arc<dyn VisionClient>>;
}

/// Builds the completion and vision clients for one configured provider
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ProviderConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ProviderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder for chats on `provider`.
    ///
    /// An OpenAI-compatible configuration serves every chat. A relay
    /// configuration switches gateway per chat; the API key and timeouts carry
    /// over, while base URL and model overrides stay with the configured one.
    pub fn for_provider(&self, provider: Provider) -> ClientBuilder {
        let relay = matches!(self.config.provider, Provider::Resita | Provider::NekoLabs);
        if provider == self.config.provider || !relay {
            return self.clone();
        }

        let mut config = ProviderConfig::new(provider);
        config.api_key = self.config.api_key.clone();
        config.timeout_seconds = self.config.timeout_seconds;
        config.vision_timeout_seconds = self.config.vision_timeout_seconds;
        ClientBuilder { config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn build_completion(&self) -> Result<Arc<dyn CompletionClient>, ProviderError> {
        match self.config.provider {
            Provider::Resita | Provider::NekoLabs => {
                Ok(Arc::new(RelayClient::new(self.config.clone())?))
            }
            Provider::OpenAI | Provider::OpenRouter | Provider::Custom => {
                Ok(Arc::new(OpenAICompatibleClient::new(self.config.clone())?))
            }
        }
    }

    /// Relay providers answer image questions through the NekoLabs gateway
    pub fn build_vision(&self) -> Result<Arc<dyn VisionClient>, ProviderError> {
        match self.config.provider {
            Provider::NekoLabs => Ok(Arc::new(RelayClient::new(self.config.clone())?)),
            Provider::Resita => {
                let mut config = ProviderConfig::nekolabs();
                config.vision_timeout_seconds = self.config.vision_timeout_seconds;
                Ok(Arc::new(RelayClient::new(config)?))
            }
            Provider::OpenAI | Provider::OpenRouter | Provider::Custom => {
                Ok(Arc::new(OpenAICompatibleClient::new(self.config.clone())?))
            }
        }
    }
}

impl ClientFactory for ClientBuilder {
    fn completion_for(&self, provider: Provider) -> ProviderResult<Arc<dyn CompletionClient>> {
        self.for_provider(provider).build_completion()
    }

    fn vision_for(&self, provider: Provider) -> ProviderResult<Arc<dyn VisionClient>> {
        self.for_provider(provider).build_vision()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_provider() {
        let relay = ClientBuilder::new()
            .with_config(ProviderConfig::nekolabs())
            .build_completion()
            .unwrap();
        assert_eq!(relay.provider(), Provider::NekoLabs);

        let openai = ClientBuilder::new()
            .with_config(ProviderConfig::openrouter("k"))
            .build_completion()
            .unwrap();
        assert_eq!(openai.provider(), Provider::OpenRouter);
    }

    #[test]
    fn test_resita_vision_builds() {
        let builder = ClientBuilder::new().with_config(ProviderConfig::resita("k"));
        assert!(builder.build_vision().is_ok());
    }

    #[test]
    fn test_relay_config_follows_chat_provider() {
        let builder = ClientBuilder::new().with_config(
            ProviderConfig::resita("key")
                .with_base_url("http://localhost:1234")
                .with_timeout(7),
        );

        let neko = builder.for_provider(Provider::NekoLabs);
        assert_eq!(neko.config().provider, Provider::NekoLabs);
        assert_eq!(
            neko.config().resolved_base_url().as_deref(),
            Some("https://api.nekolabs.my.id")
        );
        assert_eq!(neko.config().timeout_seconds, Some(7));
        assert!(neko.config().api_key.is_some());

        let client = builder.completion_for(Provider::NekoLabs).unwrap();
        assert_eq!(client.provider(), Provider::NekoLabs);

        let same = builder.for_provider(Provider::Resita);
        assert_eq!(
            same.config().resolved_base_url().as_deref(),
            Some("http://localhost:1234")
        );
    }

    #[test]
    fn test_openai_config_serves_every_chat() {
        let builder = ClientBuilder::new().with_config(ProviderConfig::openrouter("k"));
        let client = builder.completion_for(Provider::NekoLabs).unwrap();
        assert_eq!(client.provider(), Provider::OpenRouter);
    }

    #[test]
    fn test_custom_requires_base_url() {
        let builder = ClientBuilder::new().with_config(ProviderConfig::new(Provider::Custom));
        assert!(matches!(
            builder.build_completion(),
            Err(ProviderError::Configuration(_))
        ));
    }
}
