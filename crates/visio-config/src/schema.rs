use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use visio_protocol::{AiModel, ModelConfig, ModelConfigPatch, Provider};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "VISIO_API_KEY";

/// Environment variable consulted when no Thumbsnap key is configured
pub const THUMBSNAP_KEY_ENV: &str = "THUMBSNAP_API_KEY";

/// Main Visio configuration
///
/// Configuration is loaded from (in priority order):
/// 1. `visio.jsonc` - JSON with comments
/// 2. `visio.json` - Standard JSON
/// 3. `visio.yml` / `visio.yaml` - YAML format
///
/// Also checks hidden variants (`.visio.*`) and `~/.config/visio/` for global config.
///
/// # Example
///
/// ```yaml
/// provider:
///   name: openrouter
///   api_key: ${OPENROUTER_API_KEY}
///   model: google/gemini-2.0-flash-exp:free
///
/// model:
///   model: nekolabs-gpt4o
///   temperature: 0.5
///
/// storage:
///   path: ~/.visio/chats.json
///
/// upload:
///   thumbsnap_api_key: ${THUMBSNAP_API_KEY}
///
/// telemetry:
///   level: debug
///   format: json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisioConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Defaults applied to newly created chats
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    /// Image hosting for relay vision requests
    #[serde(default)]
    pub upload: UploadSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

// ============================================================================
// Provider Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub name: Provider,

    /// API key; `VISIO_API_KEY` is used when absent
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Wire model id overriding the catalog id
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub vision_model: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_vision_timeout_secs")]
    pub vision_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_vision_timeout_secs() -> u64 {
    60
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: Provider::default(),
            api_key: None,
            base_url: None,
            model: None,
            vision_model: None,
            timeout_secs: default_timeout_secs(),
            vision_timeout_secs: default_vision_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    /// Resolve the API key from config, falling back to `VISIO_API_KEY`.
    ///
    /// Empty values and unexpanded `${VAR}` references count as unset.
    pub fn api_key(&self) -> Option<SecretString> {
        resolve_key(self.api_key.as_deref(), API_KEY_ENV)
    }
}

fn resolve_key(configured: Option<&str>, env: &str) -> Option<SecretString> {
    configured
        .filter(|key| is_usable_key(key))
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok().filter(|key| is_usable_key(key)))
        .map(SecretString::from)
}

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !key.starts_with("${")
}

// ============================================================================
// Model Defaults
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub model: Option<AiModel>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub top_p: Option<f32>,

    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ModelSettings {
    /// The model configuration new chats start with
    pub fn model_config(&self) -> ModelConfig {
        let mut config = ModelConfig::default();
        config.apply(ModelConfigPatch {
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            system_prompt: self.system_prompt.clone(),
            ..Default::default()
        });
        config
    }
}

// ============================================================================
// Image Upload
// ============================================================================

/// Local images are uploaded to Thumbsnap (when keyed), then qu.ax
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadSettings {
    /// `THUMBSNAP_API_KEY` is used when absent
    #[serde(default, skip_serializing)]
    pub thumbsnap_api_key: Option<String>,

    #[serde(default)]
    pub thumbsnap_url: Option<String>,

    #[serde(default)]
    pub quax_url: Option<String>,
}

impl UploadSettings {
    pub fn thumbsnap_api_key(&self) -> Option<SecretString> {
        resolve_key(self.thumbsnap_api_key.as_deref(), THUMBSNAP_KEY_ENV)
    }
}

// ============================================================================
// Storage and Telemetry
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Chat store file; `~/` is expanded
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let raw = self.path.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(raw)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
