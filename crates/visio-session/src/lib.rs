//! Visio Session - One chat turn at a time
//!
//! [`ChatSession`] ties the store to the remote clients, picked per chat
//! provider. A turn builds the context from the history as it was before the
//! new user message, appends that message (which may refresh the running
//! summary), calls the model and appends the reply only on success.

mod error;
mod reply;
mod session;

pub use error::SessionError;
pub use reply::{format_image_reply, format_response_time};
pub use session::{ChatSession, Turn};
