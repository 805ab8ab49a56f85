//! CLI configuration

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use visio_config::{LogFormat, ProviderSettings, VisioConfig};
use visio_providers::{ClientBuilder, HostedImageUploader, ProviderConfig};
use visio_store::{default_store_path, ChatStore};
use visio_telemetry::TelemetryConfig;

/// Loaded configuration plus command-line overrides
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub config: VisioConfig,
    pub store_path: PathBuf,
    pub verbose: bool,
}

impl CliConfig {
    /// `--store` wins over `storage.path`, which wins over the default location
    pub fn load(config_path: Option<&Path>, store: Option<&Path>, verbose: bool) -> Result<Self> {
        let config = visio_config::load_config_or_default(config_path)?;

        let store_path = match store {
            Some(path) => path.to_path_buf(),
            None => match config.storage.resolved_path() {
                Some(path) => path,
                None => default_store_path().context("Cannot locate the chat store")?,
            },
        };

        Ok(Self {
            config,
            store_path,
            verbose,
        })
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        let level = if self.verbose {
            "debug".to_string()
        } else {
            self.config.telemetry.level.clone()
        };

        TelemetryConfig::default()
            .with_level(level)
            .with_json_output(self.config.telemetry.format == LogFormat::Json)
    }

    pub fn open_store(&self) -> Result<ChatStore> {
        let store = ChatStore::open(&self.store_path).with_context(|| {
            format!("Failed to open chat store: {}", self.store_path.display())
        })?;
        Ok(store.with_default_model_config(self.config.model.model_config()))
    }

    pub fn provider_config(&self) -> ProviderConfig {
        provider_config(&self.config.provider)
    }

    pub fn client_builder(&self) -> ClientBuilder {
        ClientBuilder::new().with_config(self.provider_config())
    }

    pub fn image_uploader(&self) -> Result<HostedImageUploader> {
        let settings = &self.config.upload;
        let mut uploader = HostedImageUploader::new()?;
        if let Some(key) = settings.thumbsnap_api_key() {
            uploader = uploader.with_thumbsnap_key(key);
        }
        if let Some(url) = &settings.thumbsnap_url {
            uploader = uploader.with_thumbsnap_url(url);
        }
        if let Some(url) = &settings.quax_url {
            uploader = uploader.with_quax_url(url);
        }
        Ok(uploader)
    }
}

fn provider_config(settings: &ProviderSettings) -> ProviderConfig {
    let mut config = ProviderConfig::new(settings.name)
        .with_timeout(settings.timeout_secs)
        .with_vision_timeout(settings.vision_timeout_secs);
    config.api_key = settings.api_key();

    if let Some(url) = &settings.base_url {
        config = config.with_base_url(url);
    }
    if let Some(model) = &settings.model {
        config = config.with_model(model);
    }
    if let Some(model) = &settings.vision_model {
        config = config.with_vision_model(model);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use visio_protocol::Provider;

    #[test]
    fn test_store_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("visio.json");
        std::fs::write(&config_path, r#"{"storage": {"path": "/tmp/from-config.json"}}"#).unwrap();

        let flag = dir.path().join("flag.json");
        let cli = CliConfig::load(Some(&config_path), Some(&flag), false).unwrap();
        assert_eq!(cli.store_path, flag);

        let cli = CliConfig::load(Some(&config_path), None, false).unwrap();
        assert_eq!(cli.store_path, PathBuf::from("/tmp/from-config.json"));
    }

    #[test]
    fn test_verbose_overrides_level() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("visio.yml");
        std::fs::write(&config_path, "telemetry:\n  level: error\n  format: json\n").unwrap();

        let cli = CliConfig::load(Some(&config_path), None, true).unwrap();
        let telemetry = cli.telemetry();
        assert_eq!(telemetry.level, "debug");
        assert!(telemetry.json_output);
    }

    #[test]
    fn test_relay_chats_are_served_by_their_own_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("visio.json");
        std::fs::write(&config_path, r#"{"provider": {"name": "resita"}}"#).unwrap();
        let cli = CliConfig::load(Some(&config_path), None, false).unwrap();

        let builder = cli.client_builder().for_provider(Provider::NekoLabs);
        assert_eq!(builder.config().provider, Provider::NekoLabs);
    }

    #[test]
    fn test_provider_settings_map_to_client_config() {
        let settings = ProviderSettings {
            name: Provider::OpenRouter,
            api_key: Some("sk-or".to_string()),
            base_url: Some("http://localhost:9000/".to_string()),
            model: Some("google/gemini-2.0-flash-exp:free".to_string()),
            timeout_secs: 5,
            ..Default::default()
        };

        let config = provider_config(&settings);
        assert_eq!(config.provider, Provider::OpenRouter);
        assert!(config.api_key.is_some());
        assert_eq!(config.resolved_base_url().as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.model.as_deref(), Some("google/gemini-2.0-flash-exp:free"));
        assert_eq!(config.timeout_seconds, Some(5));
        assert_eq!(config.vision_timeout_seconds, Some(60));
    }
}
