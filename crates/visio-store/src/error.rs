//! Store error types

use thiserror::Error;
use visio_protocol::{ChatId, FolderId, MessageId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("message {message_id} not found in chat {chat_id}")]
    MessageNotFound {
        chat_id: ChatId,
        message_id: MessageId,
    },

    #[error("folder not found: {0}")]
    FolderNotFound(FolderId),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store data: {0}")]
    Serialization(#[from] serde_json::Error),
}
