//! Model catalog, provider tags and per-chat model configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Provider identifier, selected once when a client is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Resita,
    NekoLabs,
    OpenAI,
    OpenRouter,
    Custom,
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resita => "Resita AI",
            Self::NekoLabs => "NekoLabs AI",
            Self::OpenAI => "OpenAI",
            Self::OpenRouter => "OpenRouter",
            Self::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resita => write!(f, "resita"),
            Self::NekoLabs => write!(f, "nekolabs"),
            Self::OpenAI => write!(f, "openai"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for Provider {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resita" => Ok(Self::Resita),
            "nekolabs" => Ok(Self::NekoLabs),
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseModelError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseModelError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Catalog entry describing a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub provider: Provider,
    pub context_window: usize,
}

macro_rules! model_catalog {
    ($($variant:ident => $id:literal, $name:literal, $provider:ident, $window:expr;)+) => {
        /// Models offered by the chat client
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum AiModel {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl AiModel {
            pub const ALL: &'static [AiModel] = &[$(AiModel::$variant),+];

            /// Wire identifier, e.g. `resita-chatgpt`
            pub fn id(&self) -> &'static str {
                match self {
                    $(Self::$variant => $id,)+
                }
            }

            pub fn info(&self) -> ModelInfo {
                match self {
                    $(Self::$variant => ModelInfo {
                        name: $name,
                        provider: Provider::$provider,
                        context_window: $window,
                    },)+
                }
            }
        }

        impl FromStr for AiModel {
            type Err = ParseModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok(Self::$variant),)+
                    _ => Err(ParseModelError::UnknownModel(s.to_string())),
                }
            }
        }
    };
}

model_catalog! {
    ResitaAiCoding => "resita-aicoding", "AI Coding", Resita, 128_000;
    ResitaClaude => "resita-claude", "Claude AI", Resita, 200_000;
    ResitaChatGpt => "resita-chatgpt", "ChatGPT 4", Resita, 128_000;
    ResitaFelo => "resita-felo", "Felo AI", Resita, 32_000;
    ResitaGemini => "resita-gemini", "Gemini", Resita, 1_000_000;
    ResitaGptLogic => "resita-gptlogic", "GPT Logic", Resita, 32_000;
    ResitaVenice => "resita-venice", "Venice AI", Resita, 32_000;
    NekoLabsGpt4o => "nekolabs-gpt4o", "GPT-4o", NekoLabs, 128_000;
    NekoLabsGpt41 => "nekolabs-gpt41", "GPT-4.1", NekoLabs, 128_000;
    NekoLabsGpt5Mini => "nekolabs-gpt5mini", "GPT-5 Mini", NekoLabs, 128_000;
    NekoLabsGpt5Nano => "nekolabs-gpt5nano", "GPT-5 Nano", NekoLabs, 128_000;
}

impl AiModel {
    pub fn display_name(&self) -> &'static str {
        self.info().name
    }

    pub fn provider(&self) -> Provider {
        self.info().provider
    }

    pub fn context_window(&self) -> usize {
        self.info().context_window
    }
}

impl Default for AiModel {
    fn default() -> Self {
        Self::ResitaChatGpt
    }
}

impl std::fmt::Display for AiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Models sharing a provider, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub label: &'static str,
    pub provider: Provider,
    pub models: Vec<AiModel>,
}

pub fn grouped_models() -> Vec<ModelGroup> {
    let mut groups: Vec<ModelGroup> = Vec::new();
    for model in AiModel::ALL {
        let provider = model.provider();
        match groups.iter_mut().find(|g| g.provider == provider) {
            Some(group) => group.models.push(*model),
            None => groups.push(ModelGroup {
                label: provider.label(),
                provider,
                models: vec![*model],
            }),
        }
    }
    groups
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with vision capabilities. You can analyze images and provide detailed information about them.";

/// Per-chat model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_config_id")]
    pub id: String,
    #[serde(default = "default_config_name")]
    pub name: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub model: AiModel,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_config_id() -> String {
    "default".to_string()
}

fn default_config_name() -> String {
    "Default Configuration".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: default_config_id(),
            name: default_config_name(),
            provider: Provider::Resita,
            model: AiModel::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

impl ModelConfig {
    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self.model.id().to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    pub fn apply(&mut self, patch: ModelConfigPatch) {
        if let Some(model) = patch.model {
            self.model = model;
            self.provider = model.provider();
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature.clamp(0.0, 2.0);
        }
        if let Some(max_tokens) = patch.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(top_p) = patch.top_p {
            self.top_p = top_p.clamp(0.0, 1.0);
        }
        if let Some(penalty) = patch.frequency_penalty {
            self.frequency_penalty = penalty.clamp(-2.0, 2.0);
        }
        if let Some(penalty) = patch.presence_penalty {
            self.presence_penalty = penalty.clamp(-2.0, 2.0);
        }
        if let Some(prompt) = patch.system_prompt {
            self.system_prompt = Some(prompt);
        }
    }
}

/// Partial update to a `ModelConfig`; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelConfigPatch {
    pub model: Option<AiModel>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub system_prompt: Option<String>,
}

impl ModelConfigPatch {
    pub fn model(model: AiModel) -> Self {
        Self {
            model: Some(model),
            ..Default::default()
        }
    }
}

/// Sampling parameters forwarded with a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        ModelConfig::default().parameters()
    }
}
