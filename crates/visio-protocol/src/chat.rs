//! Chat and folder containers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, FolderId, Message, MessageId, ModelConfig};

pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// A conversation container
///
/// `messages` is append-ordered. `summary` condenses every message up to and
/// including `last_summarized_index`; both are written by the summary
/// scheduler, and the watermark moves back when a summarized message is
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(default)]
    pub id: ChatId,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model_config: ModelConfig,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_summarized_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub total_tokens: u64,
}

fn default_title() -> String {
    DEFAULT_CHAT_TITLE.to_string()
}

impl Chat {
    pub fn new(title: impl Into<String>, model_config: ModelConfig) -> Self {
        let now = Utc::now();
        Self {
            id: ChatId::new(),
            title: title.into(),
            messages: Vec::new(),
            model_config,
            created_at: now,
            updated_at: now,
            summary: None,
            last_summarized_index: None,
            folder_id: None,
            is_starred: false,
            total_tokens: 0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn message_index(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    pub fn has_assistant_reply(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == crate::Role::Assistant)
    }

    pub fn matches(&self, lower_query: &str) -> bool {
        self.title.to_lowercase().contains(lower_query)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(lower_query))
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_TITLE, ModelConfig::default())
    }
}

/// Folder grouping chats in the sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default)]
    pub id: FolderId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FolderId>,
    #[serde(default)]
    pub chat_ids: Vec<ChatId>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Folder {
    pub fn new(name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        Self {
            id: FolderId::new(),
            name: name.into(),
            parent_id,
            chat_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
