use thiserror::Error;
use visio_protocol::{ChatId, MessageId};
use visio_providers::ProviderError;
use visio_store::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("chat {0} is already generating a reply")]
    Busy(ChatId),

    #[error("message {0} is not a user message")]
    NotUserMessage(MessageId),

    #[error("message {0} is not an assistant reply")]
    NotAssistantMessage(MessageId),

    #[error("no user message precedes {0}")]
    NoPrecedingUserMessage(MessageId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
