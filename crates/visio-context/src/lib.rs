//! Visio Context - Context window management
//!
//! This crate decides what subset of an unbounded chat history is sent to a
//! token-limited model on every turn:
//! - Context assembly: optional running summary plus a short verbatim tail
//! - Summary scheduling: staleness checks and slice-by-slice recomputation
//! - Char-safe truncation and token estimation
//! - A human-readable preview of what a model will see

mod builder;
mod preview;
mod summary;
mod truncate;

pub use builder::{
    build_context, summary_preamble, window_start, ContextBuilder, MAX_ENTRY_CHARS, RECENT_COUNT,
};
pub use preview::format_context_preview;
pub use summary::{
    generate_summary, refresh_summary_if_stale, should_update_summary, summary_state,
    update_chat_summary, SummaryState, MAX_SUMMARY_LENGTH, SLICE_SIZE, TOPIC_CHARS,
};
pub use truncate::{estimate_tokens, take_chars, truncate_with_ellipsis, ELLIPSIS};
