//! Relay gateway client
//!
//! Relay backends (Resita, NekoLabs) expose one GET endpoint per model that
//! takes the whole conversation as a single prompt string. The context is
//! flattened into a transcript before sending.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use visio_context::{estimate_tokens, truncate_with_ellipsis};
use visio_protocol::{
    AiModel, Completion, ContextEntry, ImageDescription, ModelParameters, Provider, Role,
    TokenUsage,
};

use crate::response_handling::error_from_response;
use crate::traits::{question_or_default, recent_history, ProviderResult};
use crate::{CompletionClient, ProviderConfig, ProviderError, VisionClient};

const RESITA_PATH: &str = "/ai/aicoding";
const NEKOLABS_VISION_PATH: &str = "/ai/gpt/5";
const VISION_HISTORY_CHARS: usize = 200;

const TRANSCRIPT_PREAMBLE: &str = "You are a helpful AI assistant. Continue the conversation naturally based on the chat history below.";
const TRANSCRIPT_INSTRUCTIONS: &str = "Based on the conversation above, provide a helpful and contextually relevant response. If this is the first message, respond naturally to the user's question.";

/// Flatten context entries into the single prompt a relay endpoint expects.
///
/// System entries (the running summary) are placed ahead of the history
/// block; user and assistant entries become `User:` / `Assistant:` lines.
pub fn flatten_transcript(context: &[ContextEntry]) -> String {
    let mut prompt = format!("{}\n\n", TRANSCRIPT_PREAMBLE);

    for entry in context.iter().filter(|e| e.role == Role::System) {
        prompt.push_str(&format!("{}\n\n", entry.content));
    }

    prompt.push_str("=== Chat History ===\n");
    for entry in context {
        let speaker = match entry.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        prompt.push_str(&format!("{}: {}\n", speaker, entry.content));
    }

    prompt.push_str(&format!("\n=== Instructions ===\n{}", TRANSCRIPT_INSTRUCTIONS));
    prompt
}

/// Prompt for an image question carrying a short history hint.
///
/// At most the last five entries are included, each cut to 200 characters.
pub fn vision_prompt(question: &str, history: &[ContextEntry]) -> String {
    let question = question_or_default(question);
    let recent = recent_history(history);
    if recent.is_empty() {
        return question.to_string();
    }

    let mut prompt = String::from("Previous conversation:\n");
    for entry in recent {
        let speaker = match entry.role {
            Role::User => "User",
            Role::Assistant => "AI",
            Role::System => "System",
        };
        prompt.push_str(&format!(
            "{}: {}\n",
            speaker,
            truncate_with_ellipsis(&entry.content, VISION_HISTORY_CHARS)
        ));
    }
    prompt.push_str(&format!("\nCurrent question: {}", question));
    prompt
}

/// Client for GET-style relay gateways
pub struct RelayClient {
    client: Client,
    config: ProviderConfig,
    base_url: String,
}

impl RelayClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if !matches!(config.provider, Provider::Resita | Provider::NekoLabs) {
            return Err(ProviderError::Configuration(format!(
                "{} is not a relay provider",
                config.provider.label()
            )));
        }

        let base_url = config
            .resolved_base_url()
            .ok_or_else(|| ProviderError::Configuration("base URL required".into()))?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Endpoint path serving `model` on this gateway
    fn endpoint(&self, model: &str) -> ProviderResult<&'static str> {
        let unsupported = || ProviderError::UnsupportedModel {
            model: model.to_string(),
            provider: self.config.provider.to_string(),
        };
        let parsed: AiModel = model.parse().map_err(|_| unsupported())?;

        match (self.config.provider, parsed) {
            (Provider::Resita, m) if m.provider() == Provider::Resita => Ok(RESITA_PATH),
            (Provider::NekoLabs, AiModel::NekoLabsGpt4o) => Ok("/ai/gpt/4o"),
            (Provider::NekoLabs, AiModel::NekoLabsGpt41) => Ok("/ai/gpt/4.1"),
            (Provider::NekoLabs, AiModel::NekoLabsGpt5Mini) => Ok("/ai/gpt/5-mini"),
            (Provider::NekoLabs, AiModel::NekoLabsGpt5Nano) => Ok("/ai/gpt/5-nano"),
            _ => Err(unsupported()),
        }
    }

    fn query(&self, prompt: String) -> Vec<(&'static str, String)> {
        match self.config.provider {
            Provider::Resita => {
                let mut query = vec![("prompt", prompt)];
                if let Some(key) = &self.config.api_key {
                    query.push(("apikey", key.expose_secret().to_string()));
                }
                query
            }
            _ => vec![("text", prompt)],
        }
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        timeout: Option<std::time::Duration>,
    ) -> ProviderResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.get(&url).query(query);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: RelayResponse = response.json().await?;
        body.into_text()
    }
}

#[async_trait]
impl CompletionClient for RelayClient {
    async fn submit(
        &self,
        context: &[ContextEntry],
        params: &ModelParameters,
    ) -> ProviderResult<Completion> {
        let has_content = context
            .last()
            .is_some_and(|entry| !entry.content.trim().is_empty());
        if !has_content {
            return Err(ProviderError::EmptyRequest("empty message content".into()));
        }

        let model = self.config.model.as_deref().unwrap_or(&params.model);
        let path = self.endpoint(model)?;
        let prompt = flatten_transcript(context);
        let prompt_tokens = estimate_tokens(&prompt);

        tracing::debug!(
            provider = %self.config.provider,
            model,
            path,
            prompt_chars = prompt.chars().count(),
            "submitting relay completion"
        );

        let content = self.get(path, &self.query(prompt), None).await?;
        let usage = TokenUsage {
            prompt_tokens,
            completion_tokens: estimate_tokens(&content),
        };
        Ok(Completion::new(content, usage))
    }

    fn provider(&self) -> Provider {
        self.config.provider
    }
}

#[async_trait]
impl VisionClient for RelayClient {
    async fn analyze_image(
        &self,
        image_url: &str,
        question: &str,
        history: &[ContextEntry],
    ) -> ProviderResult<ImageDescription> {
        if self.config.provider != Provider::NekoLabs {
            return Err(ProviderError::Configuration(format!(
                "{} does not serve image questions",
                self.config.provider.label()
            )));
        }
        if image_url.starts_with("data:") {
            return Err(ProviderError::InvalidImage(
                "relay gateways need a hosted image URL; upload the file first".into(),
            ));
        }

        let session_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| format!("chat-{}", d.as_millis()))
            .unwrap_or_else(|_| "chat-0".to_string());
        let query = vec![
            ("text", vision_prompt(question, history)),
            ("imageUrl", image_url.to_string()),
            ("sessionId", session_id),
        ];

        let started = Instant::now();
        let description = self
            .get(
                NEKOLABS_VISION_PATH,
                &query,
                Some(self.config.vision_timeout()),
            )
            .await?;

        Ok(ImageDescription {
            description,
            response_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Response envelope shared by relay endpoints
#[derive(Debug, Default, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    result: Option<String>,
    answer: Option<String>,
    description: Option<String>,
    error: Option<String>,
}

impl RelayResponse {
    fn into_text(self) -> ProviderResult<String> {
        let success = self.success;
        let text = self
            .result
            .or(self.answer)
            .or(if success { self.message.clone() } else { None })
            .or(if success { self.description } else { None })
            .filter(|t| !t.trim().is_empty());

        text.ok_or_else(|| {
            ProviderError::InvalidResponse(
                self.message
                    .or(self.error)
                    .unwrap_or_else(|| "API returned no answer or result".to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_transcript() {
        let context = vec![
            ContextEntry::system("Previous conversation summary:\nTopics discussed: rust"),
            ContextEntry::user("hello"),
            ContextEntry::assistant("hi there"),
            ContextEntry::user("what's next?"),
        ];
        let prompt = flatten_transcript(&context);

        assert!(prompt.starts_with(TRANSCRIPT_PREAMBLE));
        let summary_at = prompt.find("Topics discussed: rust").unwrap();
        let history_at = prompt.find("=== Chat History ===").unwrap();
        assert!(summary_at < history_at);
        assert!(prompt.contains("User: hello\nAssistant: hi there\nUser: what's next?\n"));
        assert!(prompt.ends_with(TRANSCRIPT_INSTRUCTIONS));
    }

    #[test]
    fn test_vision_prompt_without_history() {
        assert_eq!(vision_prompt("  what breed?  ", &[]), "what breed?");
        assert_eq!(vision_prompt("", &[]), crate::DEFAULT_VISION_QUESTION);
    }

    #[test]
    fn test_vision_prompt_with_history() {
        let history: Vec<ContextEntry> = (0..7)
            .map(|i| {
                if i % 2 == 0 {
                    ContextEntry::user(format!("u{}", i))
                } else {
                    ContextEntry::assistant("x".repeat(300))
                }
            })
            .collect();
        let prompt = vision_prompt("and this one?", &history);

        assert!(prompt.starts_with("Previous conversation:\nUser: u2\n"));
        assert!(!prompt.contains("u0"));
        assert!(prompt.contains(&format!("AI: {}...\n", "x".repeat(200))));
        assert!(prompt.ends_with("\nCurrent question: and this one?"));
    }

    #[test]
    fn test_endpoints() {
        let neko = RelayClient::new(ProviderConfig::nekolabs()).unwrap();
        assert_eq!(neko.endpoint("nekolabs-gpt41").unwrap(), "/ai/gpt/4.1");
        assert_eq!(neko.endpoint("nekolabs-gpt5nano").unwrap(), "/ai/gpt/5-nano");
        assert!(matches!(
            neko.endpoint("resita-claude"),
            Err(ProviderError::UnsupportedModel { .. })
        ));

        let resita = RelayClient::new(ProviderConfig::resita("key")).unwrap();
        assert_eq!(resita.endpoint("resita-gemini").unwrap(), RESITA_PATH);
        assert!(resita.endpoint("gpt-4o").is_err());
    }

    #[test]
    fn test_relay_rejects_openai() {
        assert!(RelayClient::new(ProviderConfig::openai("k")).is_err());
    }

    #[test]
    fn test_response_envelopes() {
        let ok: RelayResponse =
            serde_json::from_str(r#"{"success": true, "message": "hi"}"#).unwrap();
        assert_eq!(ok.into_text().unwrap(), "hi");

        let answer: RelayResponse = serde_json::from_str(r#"{"answer": "42"}"#).unwrap();
        assert_eq!(answer.into_text().unwrap(), "42");

        let failed: RelayResponse =
            serde_json::from_str(r#"{"success": false, "message": "invalid apikey"}"#).unwrap();
        let err = failed.into_text().unwrap_err();
        assert!(err.to_string().contains("invalid apikey"));

        let empty = RelayResponse::default();
        assert!(empty.into_text().is_err());
    }
}
