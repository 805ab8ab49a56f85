//! OpenAI-compatible client implementation

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use visio_context::estimate_tokens;
use visio_protocol::{
    Completion, ContextEntry, ImageDescription, ModelParameters, Provider, Role, TokenUsage,
};

use crate::response_handling::error_from_response;
use crate::traits::{question_or_default, recent_history, ProviderResult};
use crate::{CompletionClient, ProviderConfig, ProviderError, VisionClient};

const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Client for any backend speaking `POST /v1/chat/completions`
pub struct OpenAICompatibleClient {
    client: Client,
    config: ProviderConfig,
    base_url: String,
}

impl OpenAICompatibleClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config.resolved_base_url().ok_or_else(|| {
            ProviderError::Configuration("base URL required for a custom provider".into())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &config.api_key {
            Some(api_key) => {
                let value = format!("Bearer {}", api_key.expose_secret())
                    .parse()
                    .map_err(|_| ProviderError::Configuration("Invalid API key format".into()))?;
                headers.insert(AUTHORIZATION, value);
            }
            None if config.provider != Provider::Custom => {
                return Err(ProviderError::Configuration(format!(
                    "API key required for {}",
                    config.provider.label()
                )));
            }
            None => {}
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, context: &[ContextEntry], params: &ModelParameters) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone().unwrap_or_else(|| params.model.clone()),
            messages: context.iter().map(ChatMessage::from).collect(),
            max_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature),
            top_p: Some(params.top_p),
            frequency_penalty: Some(params.frequency_penalty),
            presence_penalty: Some(params.presence_penalty),
        }
    }

    fn build_vision_request(
        &self,
        image_url: &str,
        question: &str,
        history: &[ContextEntry],
    ) -> ChatRequest {
        let mut messages: Vec<ChatMessage> =
            recent_history(history).iter().map(ChatMessage::from).collect();
        messages.push(ChatMessage {
            role: Role::User.as_str(),
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: question_or_default(question).to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.to_string(),
                    },
                },
            ]),
        });

        ChatRequest {
            model: self
                .config
                .vision_model
                .clone()
                .or_else(|| self.config.model.clone())
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    async fn post(
        &self,
        request: &ChatRequest,
        timeout: Option<std::time::Duration>,
    ) -> ProviderResult<ChatResponse> {
        let mut builder = self.client.post(self.completions_url()).json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CompletionClient for OpenAICompatibleClient {
    async fn submit(
        &self,
        context: &[ContextEntry],
        params: &ModelParameters,
    ) -> ProviderResult<Completion> {
        let request = self.build_request(context, params);
        tracing::debug!(
            provider = %self.config.provider,
            model = %request.model,
            entries = request.messages.len(),
            "submitting chat completion"
        );

        let response = self.post(&request, None).await?;
        let content = response.first_content()?;

        let usage = match response.usage {
            Some(usage) => TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
            None => TokenUsage {
                prompt_tokens: context.iter().map(|e| estimate_tokens(&e.content)).sum(),
                completion_tokens: estimate_tokens(&content),
            },
        };

        Ok(Completion::new(content, usage))
    }

    fn provider(&self) -> Provider {
        self.config.provider
    }
}

#[async_trait]
impl VisionClient for OpenAICompatibleClient {
    async fn analyze_image(
        &self,
        image_url: &str,
        question: &str,
        history: &[ContextEntry],
    ) -> ProviderResult<ImageDescription> {
        let request = self.build_vision_request(image_url, question, history);
        let started = Instant::now();

        let response = self
            .post(&request, Some(self.config.vision_timeout()))
            .await?;
        let description = response.first_content()?;

        Ok(ImageDescription {
            description,
            response_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

// API request/response types
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

impl From<&ContextEntry> for ChatMessage {
    fn from(entry: &ContextEntry) -> Self {
        Self {
            role: entry.role.as_str(),
            content: MessageContent::Text(entry.content.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

impl ChatResponse {
    fn first_content(&self) -> ProviderResult<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("response contained no message".into()))
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
