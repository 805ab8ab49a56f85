//! Chat state owner

use std::collections::HashSet;
use std::path::PathBuf;
use visio_context::{refresh_summary_if_stale, truncate_with_ellipsis, update_chat_summary};
use visio_protocol::{
    Chat, ChatId, Folder, FolderId, Message, MessageId, ModelConfig, ModelConfigPatch, NewMessage,
    DEFAULT_CHAT_TITLE,
};

use crate::{ChatStorage, StoreError, StoreSnapshot};

const AUTO_TITLE_CHARS: usize = 50;

/// Owns all chats, folders and the current-chat pointer.
///
/// Chats are kept newest first. Nothing is persisted implicitly; call
/// [`ChatStore::save`] after mutating.
#[derive(Debug, Default)]
pub struct ChatStore {
    chats: Vec<Chat>,
    current_chat_id: Option<ChatId>,
    folders: Vec<Folder>,
    default_model_config: ModelConfig,
    storage: Option<ChatStorage>,
}

impl ChatStore {
    /// An empty store with no backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading existing chats if present
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage = ChatStorage::new(path);
        let snapshot = storage.load()?;
        tracing::debug!(
            path = %storage.path().display(),
            chats = snapshot.chats.len(),
            "opened chat store"
        );

        let mut store = Self::from_snapshot(snapshot);
        store.storage = Some(storage);
        Ok(store)
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            chats: snapshot.chats,
            current_chat_id: snapshot.current_chat_id,
            folders: snapshot.folders,
            default_model_config: ModelConfig::default(),
            storage: None,
        }
    }

    pub fn with_default_model_config(mut self, config: ModelConfig) -> Self {
        self.default_model_config = config;
        self
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            chats: self.chats.clone(),
            current_chat_id: self.current_chat_id.clone(),
            folders: self.folders.clone(),
        }
    }

    /// Persist the current state; a no-op for in-memory stores
    pub fn save(&self) -> Result<(), StoreError> {
        match &self.storage {
            Some(storage) => storage.save(&self.snapshot()),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, chat_id: &ChatId) -> Result<&Chat, StoreError> {
        self.chats
            .iter()
            .find(|c| &c.id == chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))
    }

    fn chat_mut(&mut self, chat_id: &ChatId) -> Result<&mut Chat, StoreError> {
        self.chats
            .iter_mut()
            .find(|c| &c.id == chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve_chat_id(&self, id_or_prefix: &str) -> Result<ChatId, StoreError> {
        if let Some(chat) = self.chats.iter().find(|c| c.id.as_str() == id_or_prefix) {
            return Ok(chat.id.clone());
        }

        let mut matches = self
            .chats
            .iter()
            .filter(|c| c.id.as_str().starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(chat), None) if !id_or_prefix.is_empty() => Ok(chat.id.clone()),
            _ => Err(StoreError::ChatNotFound(ChatId::from(id_or_prefix))),
        }
    }

    /// Create a chat, make it current and return its id
    pub fn create_chat(&mut self, title: Option<&str>) -> ChatId {
        let chat = Chat::new(
            title.unwrap_or(DEFAULT_CHAT_TITLE),
            self.default_model_config.clone(),
        );
        let id = chat.id.clone();
        tracing::debug!(chat_id = %id, "created chat");

        self.chats.insert(0, chat);
        self.current_chat_id = Some(id.clone());
        id
    }

    pub fn delete_chat(&mut self, chat_id: &ChatId) -> Result<Chat, StoreError> {
        let pos = self
            .chats
            .iter()
            .position(|c| &c.id == chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))?;
        let chat = self.chats.remove(pos);

        if self.current_chat_id.as_ref() == Some(chat_id) {
            self.current_chat_id = None;
        }
        for folder in &mut self.folders {
            folder.chat_ids.retain(|id| id != chat_id);
        }
        Ok(chat)
    }

    pub fn rename_chat(&mut self, chat_id: &ChatId, title: &str) -> Result<(), StoreError> {
        let chat = self.chat_mut(chat_id)?;
        chat.title = title.to_string();
        chat.touch();
        Ok(())
    }

    /// Title a chat after its first message (first 50 chars plus ellipsis)
    pub fn auto_rename_chat(
        &mut self,
        chat_id: &ChatId,
        first_message: &str,
    ) -> Result<String, StoreError> {
        let title = truncate_with_ellipsis(first_message.trim(), AUTO_TITLE_CHARS).into_owned();
        self.rename_chat(chat_id, &title)?;
        Ok(title)
    }

    /// Toggle the star flag, returning the new value
    pub fn star_chat(&mut self, chat_id: &ChatId) -> Result<bool, StoreError> {
        let chat = self.chat_mut(chat_id)?;
        chat.is_starred = !chat.is_starred;
        Ok(chat.is_starred)
    }

    pub fn set_current_chat(&mut self, chat_id: &ChatId) -> Result<(), StoreError> {
        self.chat(chat_id)?;
        self.current_chat_id = Some(chat_id.clone());
        Ok(())
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        let id = self.current_chat_id.as_ref()?;
        self.chats.iter().find(|c| &c.id == id)
    }

    /// Merge chats from an export, skipping ids already present.
    ///
    /// New chats are placed ahead of existing ones. Returns how many were added.
    pub fn import_chats(&mut self, imported: Vec<Chat>) -> usize {
        let existing: HashSet<ChatId> = self.chats.iter().map(|c| c.id.clone()).collect();
        let mut fresh: Vec<Chat> = imported
            .into_iter()
            .filter(|c| !existing.contains(&c.id))
            .collect();
        let added = fresh.len();

        fresh.append(&mut self.chats);
        self.chats = fresh;
        tracing::info!(added, total = self.chats.len(), "imported chats");
        added
    }

    /// Case-insensitive search over chat titles and message contents
    pub fn search_chats(&self, query: &str) -> Vec<&Chat> {
        let lower = query.to_lowercase();
        self.chats.iter().filter(|c| c.matches(&lower)).collect()
    }

    pub fn clear_all(&mut self) {
        self.chats.clear();
        self.folders.clear();
        self.current_chat_id = None;
    }

    pub fn update_model_config(
        &mut self,
        chat_id: &ChatId,
        patch: ModelConfigPatch,
    ) -> Result<&ModelConfig, StoreError> {
        let chat = self.chat_mut(chat_id)?;
        chat.model_config.apply(patch);
        Ok(&chat.model_config)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message, then run the summary staleness check.
    ///
    /// The summary is recomputed in the same call when stale, so the next
    /// context build always sees an up-to-date watermark.
    pub fn add_message(
        &mut self,
        chat_id: &ChatId,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        let chat = self.chat_mut(chat_id)?;
        let message = message.into_message();

        chat.total_tokens += message.tokens.unwrap_or(0);
        chat.messages.push(message.clone());
        chat.touch();

        if refresh_summary_if_stale(chat) {
            tracing::info!(
                chat_id = %chat_id,
                watermark = ?chat.last_summarized_index,
                "summary refreshed after append"
            );
        }

        Ok(message)
    }

    /// Edit a message in place, flagging it as edited
    pub fn update_message(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), StoreError> {
        let chat = self.chat_mut(chat_id)?;
        let message = chat
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| StoreError::MessageNotFound {
                chat_id: chat_id.clone(),
                message_id: message_id.clone(),
            })?;
        message.edit(content);
        chat.touch();
        Ok(())
    }

    /// Remove a message.
    ///
    /// Removing a summarized message pulls the watermark back by one so the
    /// next unsummarized message stays in the verbatim window. When the last
    /// summarized message goes, the summary is dropped.
    pub fn delete_message(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
    ) -> Result<Message, StoreError> {
        let chat = self.chat_mut(chat_id)?;
        let pos = chat
            .message_index(message_id)
            .ok_or_else(|| StoreError::MessageNotFound {
                chat_id: chat_id.clone(),
                message_id: message_id.clone(),
            })?;
        let removed = chat.messages.remove(pos);

        if let Some(k) = chat.last_summarized_index.filter(|&k| pos <= k) {
            chat.last_summarized_index = k.checked_sub(1);
            if chat.last_summarized_index.is_none() {
                chat.summary = None;
            }
            tracing::debug!(
                chat_id = %chat_id,
                watermark = ?chat.last_summarized_index,
                "lowered summary watermark after delete"
            );
        }

        chat.touch();
        Ok(removed)
    }

    /// Force a summary recomputation; returns whether the chat changed
    pub fn update_chat_summary(&mut self, chat_id: &ChatId) -> Result<bool, StoreError> {
        let chat = self.chat_mut(chat_id)?;
        Ok(update_chat_summary(chat))
    }

    // ------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn create_folder(&mut self, name: &str, parent_id: Option<FolderId>) -> FolderId {
        let folder = Folder::new(name, parent_id);
        let id = folder.id.clone();
        self.folders.push(folder);
        id
    }

    /// Remove a folder; its chats stay but lose their folder
    pub fn delete_folder(&mut self, folder_id: &FolderId) -> Result<(), StoreError> {
        let before = self.folders.len();
        self.folders.retain(|f| &f.id != folder_id);
        if self.folders.len() == before {
            return Err(StoreError::FolderNotFound(folder_id.clone()));
        }

        for chat in &mut self.chats {
            if chat.folder_id.as_ref() == Some(folder_id) {
                chat.folder_id = None;
            }
        }
        Ok(())
    }

    pub fn move_to_folder(
        &mut self,
        chat_id: &ChatId,
        folder_id: &FolderId,
    ) -> Result<(), StoreError> {
        if !self.folders.iter().any(|f| &f.id == folder_id) {
            return Err(StoreError::FolderNotFound(folder_id.clone()));
        }

        let chat = self.chat_mut(chat_id)?;
        chat.folder_id = Some(folder_id.clone());

        for folder in &mut self.folders {
            if &folder.id == folder_id {
                if !folder.chat_ids.contains(chat_id) {
                    folder.chat_ids.push(chat_id.clone());
                }
            } else {
                folder.chat_ids.retain(|id| id != chat_id);
            }
        }
        Ok(())
    }
}
