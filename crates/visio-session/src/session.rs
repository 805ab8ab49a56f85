use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use visio_context::{estimate_tokens, ContextBuilder};
use visio_protocol::{
    AiModel, Chat, ChatId, Completion, ContextEntry, ImageAttachment, Message, MessageId,
    ModelConfigPatch, ModelParameters, NewMessage, Provider, Role, TokenUsage,
    DEFAULT_CHAT_TITLE,
};
use visio_providers::{
    ClientFactory, CompletionClient, ProviderResult, VisionClient, VISION_HISTORY_LEN,
};
use visio_store::{ChatStore, StoreError};

use crate::{format_image_reply, SessionError};

/// Outcome of a completed turn
#[derive(Debug, Clone)]
pub struct Turn {
    pub chat_id: ChatId,
    /// The user message that was answered
    pub user_message: Message,
    pub reply: Message,
    pub usage: TokenUsage,
    /// New title, when the chat was auto-renamed on its first reply
    pub renamed_to: Option<String>,
}

/// Everything a remote call needs, captured while the store is locked
struct PreparedTurn {
    provider: Provider,
    context: Vec<ContextEntry>,
    history_hint: Vec<ContextEntry>,
    params: ModelParameters,
    question: String,
    image_url: Option<String>,
}

impl PreparedTurn {
    /// Prepare a turn answering `text` against `chat.messages[..end]`
    fn from_history(chat: &Chat, end: usize, text: &str, images: &[ImageAttachment]) -> Self {
        let history = &chat.messages[..end];

        let mut context = ContextBuilder::new(history)
            .with_summary(chat.summary.as_deref(), chat.last_summarized_index)
            .build();
        context.push(ContextEntry::user(text));

        let history_hint = history[history.len().saturating_sub(VISION_HISTORY_LEN)..]
            .iter()
            .map(ContextEntry::from)
            .collect();

        Self {
            provider: chat.model_config.provider,
            context,
            history_hint,
            params: chat.model_config.parameters(),
            question: text.to_string(),
            image_url: images.first().map(|image| image.url.clone()),
        }
    }
}

/// Clears the chat's generating flag when dropped
struct GeneratingGuard<'a> {
    generating: &'a Mutex<HashSet<ChatId>>,
    chat_id: ChatId,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.generating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.chat_id);
    }
}

/// One client pair answering for every provider
struct FixedClients {
    completion: Arc<dyn CompletionClient>,
    vision: Arc<dyn VisionClient>,
}

impl ClientFactory for FixedClients {
    fn completion_for(&self, _provider: Provider) -> ProviderResult<Arc<dyn CompletionClient>> {
        Ok(self.completion.clone())
    }

    fn vision_for(&self, _provider: Provider) -> ProviderResult<Arc<dyn VisionClient>> {
        Ok(self.vision.clone())
    }
}

/// Drives chat turns against a store and the remote clients.
///
/// Clients are picked per turn from the chat's own provider. At most one turn
/// runs per chat; other chats proceed independently.
pub struct ChatSession {
    store: AsyncMutex<ChatStore>,
    clients: Arc<dyn ClientFactory>,
    generating: Mutex<HashSet<ChatId>>,
}

impl ChatSession {
    /// Session answering every chat with the same pair of clients
    pub fn new(
        store: ChatStore,
        completion: Arc<dyn CompletionClient>,
        vision: Arc<dyn VisionClient>,
    ) -> Self {
        Self::with_factory(store, Arc::new(FixedClients { completion, vision }))
    }

    pub fn with_factory(store: ChatStore, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            store: AsyncMutex::new(store),
            clients,
            generating: Mutex::new(HashSet::new()),
        }
    }

    /// Exclusive access to the store between turns
    pub async fn store(&self) -> MutexGuard<'_, ChatStore> {
        self.store.lock().await
    }

    pub fn into_store(self) -> ChatStore {
        self.store.into_inner()
    }

    pub fn is_generating(&self, chat_id: &ChatId) -> bool {
        self.generating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(chat_id)
    }

    fn begin(&self, chat_id: &ChatId) -> Result<GeneratingGuard<'_>, SessionError> {
        let mut generating = self
            .generating
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !generating.insert(chat_id.clone()) {
            return Err(SessionError::Busy(chat_id.clone()));
        }

        Ok(GeneratingGuard {
            generating: &self.generating,
            chat_id: chat_id.clone(),
        })
    }

    /// Send a new user message and wait for the reply.
    ///
    /// When images are attached the first one is sent to the vision client
    /// together with the recent history; otherwise the summary-aware context
    /// goes to the completion client. On failure the user message stays in
    /// the chat and no reply is appended.
    pub async fn send(
        &self,
        chat_id: &ChatId,
        text: &str,
        images: Vec<ImageAttachment>,
    ) -> Result<Turn, SessionError> {
        let _guard = self.begin(chat_id)?;

        let (prepared, user_message) = {
            let mut store = self.store.lock().await;
            let chat = store.chat(chat_id)?;
            let prepared = PreparedTurn::from_history(chat, chat.messages.len(), text, &images);

            let message = NewMessage::user(text)
                .with_images(images)
                .with_tokens(estimate_tokens(text));
            let user_message = store.add_message(chat_id, message)?;
            (prepared, user_message)
        };

        self.complete(chat_id, prepared, user_message).await
    }

    /// Replace a user message's text and answer it again.
    ///
    /// An assistant reply directly after the edited message is removed first.
    /// The new reply is appended at the end of the chat.
    pub async fn edit_and_resend(
        &self,
        chat_id: &ChatId,
        message_id: &MessageId,
        text: &str,
    ) -> Result<Turn, SessionError> {
        let _guard = self.begin(chat_id)?;

        let (prepared, user_message) = {
            let mut store = self.store.lock().await;
            let index = locate(store.chat(chat_id)?, chat_id, message_id)?;
            let chat = store.chat(chat_id)?;
            if chat.messages[index].role != Role::User {
                return Err(SessionError::NotUserMessage(message_id.clone()));
            }
            let following_reply = chat
                .messages
                .get(index + 1)
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.id.clone());

            store.update_message(chat_id, message_id, text)?;
            if let Some(reply_id) = following_reply {
                store.delete_message(chat_id, &reply_id)?;
            }

            let chat = store.chat(chat_id)?;
            let user_message = chat.messages[index].clone();
            let prepared = PreparedTurn::from_history(chat, index, text, &user_message.images);
            (prepared, user_message)
        };

        tracing::debug!(chat_id = %chat_id, message_id = %message_id, "resending edited message");
        self.complete(chat_id, prepared, user_message).await
    }

    /// Drop an assistant reply and ask again, optionally with another model
    pub async fn regenerate(
        &self,
        chat_id: &ChatId,
        message_id: &MessageId,
        model: Option<AiModel>,
    ) -> Result<Turn, SessionError> {
        let _guard = self.begin(chat_id)?;

        let (prepared, user_message) = {
            let mut store = self.store.lock().await;
            let chat = store.chat(chat_id)?;
            let index = locate(chat, chat_id, message_id)?;
            if chat.messages[index].role != Role::Assistant {
                return Err(SessionError::NotAssistantMessage(message_id.clone()));
            }
            let user_index = index
                .checked_sub(1)
                .filter(|&i| chat.messages[i].role == Role::User)
                .ok_or_else(|| SessionError::NoPrecedingUserMessage(message_id.clone()))?;

            if let Some(model) = model.filter(|m| *m != chat.model_config.model) {
                store.update_model_config(chat_id, ModelConfigPatch::model(model))?;
                tracing::info!(
                    chat_id = %chat_id,
                    model = %model,
                    "switched model for regeneration"
                );
            }
            store.delete_message(chat_id, message_id)?;

            let chat = store.chat(chat_id)?;
            let user_message = chat.messages[user_index].clone();
            let prepared = PreparedTurn::from_history(
                chat,
                user_index,
                &user_message.content,
                &user_message.images,
            );
            (prepared, user_message)
        };

        self.complete(chat_id, prepared, user_message).await
    }

    async fn complete(
        &self,
        chat_id: &ChatId,
        prepared: PreparedTurn,
        user_message: Message,
    ) -> Result<Turn, SessionError> {
        let result = self.call_model(&prepared).await;

        let mut store = self.store.lock().await;

        let completion = match result {
            Ok(completion) => completion,
            Err(err) => {
                tracing::warn!(
                    chat_id = %chat_id,
                    error = %err,
                    "model call failed, no reply appended"
                );
                if let Err(save_err) = store.save() {
                    tracing::warn!(error = %save_err, "failed to persist chat after failed turn");
                }
                return Err(err.into());
            }
        };

        let first_reply = !store.chat(chat_id)?.has_assistant_reply();
        let reply = store.add_message(
            chat_id,
            NewMessage::assistant(completion.content)
                .with_tokens(completion.usage.completion_tokens),
        )?;

        let renamed_to = if first_reply {
            auto_rename(&mut store, chat_id, &user_message.content)?
        } else {
            None
        };

        store.save()?;

        tracing::info!(
            chat_id = %chat_id,
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "turn completed"
        );

        Ok(Turn {
            chat_id: chat_id.clone(),
            user_message,
            reply,
            usage: completion.usage,
            renamed_to,
        })
    }

    async fn call_model(&self, prepared: &PreparedTurn) -> ProviderResult<Completion> {
        tracing::debug!(
            provider = %prepared.provider,
            model = %prepared.params.model,
            "calling model"
        );

        match &prepared.image_url {
            Some(url) => {
                let description = self
                    .clients
                    .vision_for(prepared.provider)?
                    .analyze_image(url, &prepared.question, &prepared.history_hint)
                    .await?;
                let content =
                    format_image_reply(&description.description, description.response_time_ms);
                let usage = TokenUsage {
                    prompt_tokens: estimate_tokens(&prepared.question),
                    completion_tokens: estimate_tokens(&content),
                };
                Ok(Completion::new(content, usage))
            }
            None => {
                self.clients
                    .completion_for(prepared.provider)?
                    .submit(&prepared.context, &prepared.params)
                    .await
            }
        }
    }
}

fn locate(chat: &Chat, chat_id: &ChatId, message_id: &MessageId) -> Result<usize, SessionError> {
    chat.message_index(message_id).ok_or_else(|| {
        StoreError::MessageNotFound {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
        }
        .into()
    })
}

fn auto_rename(
    store: &mut ChatStore,
    chat_id: &ChatId,
    first_message: &str,
) -> Result<Option<String>, SessionError> {
    let untitled = store.chat(chat_id)?.title == DEFAULT_CHAT_TITLE;
    if !untitled || first_message.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(store.auto_rename_chat(chat_id, first_message)?))
}
