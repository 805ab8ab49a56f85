//! Visio Protocol - Shared chat types
//!
//! This crate defines the data model used across the Visio chat client:
//! - Messages, attachments and the `ContextEntry` projection sent to models
//! - Chats and folders
//! - Model catalog, provider tags and per-chat model configuration
//! - Remote call results (completions, image descriptions, token usage)

mod chat;
mod messages;
mod model;
mod types;

pub use chat::*;
pub use messages::*;
pub use model::*;
pub use types::*;
