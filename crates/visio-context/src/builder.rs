//! Assembly of the context sent to a model on every turn

use visio_protocol::{Chat, ContextEntry, Message};

use crate::truncate::truncate_with_ellipsis;

/// Number of trailing messages always sent verbatim
pub const RECENT_COUNT: usize = 5;

/// Per-message content ceiling, in characters, before the ellipsis marker
pub const MAX_ENTRY_CHARS: usize = 1000;

/// Text of the synthetic system entry carrying the running summary
pub fn summary_preamble(summary: &str) -> String {
    format!(
        "Previous conversation summary:\n{}\n\nContinue the conversation naturally based on the context above.",
        summary
    )
}

/// First index of the verbatim window.
///
/// With a watermark `k` the window starts at `max(k + 1, len - RECENT_COUNT)`,
/// otherwise at `max(0, len - RECENT_COUNT)`. The result never exceeds `len`.
pub fn window_start(len: usize, last_summarized_index: Option<usize>) -> usize {
    let tail_start = len.saturating_sub(RECENT_COUNT);
    match last_summarized_index {
        Some(k) => k.saturating_add(1).max(tail_start).min(len),
        None => tail_start,
    }
}

/// Builds the ordered context entries for the next turn of a chat
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder<'a> {
    messages: &'a [Message],
    summary: Option<&'a str>,
    last_summarized_index: Option<usize>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            summary: None,
            last_summarized_index: None,
        }
    }

    pub fn from_chat(chat: &'a Chat) -> Self {
        Self {
            messages: &chat.messages,
            summary: chat.summary.as_deref(),
            last_summarized_index: chat.last_summarized_index,
        }
    }

    pub fn with_summary(
        mut self,
        summary: Option<&'a str>,
        last_summarized_index: Option<usize>,
    ) -> Self {
        self.summary = summary;
        self.last_summarized_index = last_summarized_index;
        self
    }

    /// The `(summary, watermark)` pair, if it can be combined with the window.
    ///
    /// Both halves must be present, the summary non-empty and the watermark
    /// inside the message list; anything else is treated as no summary.
    fn valid_summary(&self) -> Option<(&'a str, usize)> {
        match (self.summary, self.last_summarized_index) {
            (Some(summary), Some(index))
                if !summary.is_empty() && index < self.messages.len() =>
            {
                Some((summary, index))
            }
            (Some(_), _) | (_, Some(_)) => {
                tracing::debug!(
                    has_summary = self.summary.is_some(),
                    watermark = ?self.last_summarized_index,
                    messages = self.messages.len(),
                    "ignoring inconsistent summary state"
                );
                None
            }
            (None, None) => None,
        }
    }

    pub fn build(&self) -> Vec<ContextEntry> {
        let valid = self.valid_summary();
        let watermark = valid.map(|(_, index)| index);
        let start = window_start(self.messages.len(), watermark);

        let mut context = Vec::with_capacity(self.messages.len() - start + 1);

        if let Some((summary, _)) = valid {
            context.push(ContextEntry::system(summary_preamble(summary)));
        }

        context.extend(self.messages[start..].iter().map(|msg| {
            ContextEntry::new(
                msg.role,
                truncate_with_ellipsis(&msg.content, MAX_ENTRY_CHARS).into_owned(),
            )
        }));

        tracing::trace!(
            start,
            end = self.messages.len(),
            with_summary = valid.is_some(),
            "built context window"
        );

        context
    }
}

/// Produce the ordered context entries to submit for the next turn.
///
/// Output is `[summary entry?] ++ window`, where the window is every message
/// from [`window_start`] to the end with content truncated to
/// [`MAX_ENTRY_CHARS`]. No message at or before the watermark is repeated.
pub fn build_context(
    messages: &[Message],
    summary: Option<&str>,
    last_summarized_index: Option<usize>,
) -> Vec<ContextEntry> {
    ContextBuilder::new(messages)
        .with_summary(summary, last_summarized_index)
        .build()
}
