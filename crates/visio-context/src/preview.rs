//! Human-readable preview of a chat's context state

use visio_protocol::{Message, Role};

use crate::truncate::take_chars;

const PREVIEW_TAIL: usize = 3;
const PREVIEW_CHARS: usize = 50;

/// Render the summary and the last few messages for debugging output
pub fn format_context_preview(messages: &[Message], summary: Option<&str>) -> String {
    let mut preview = String::new();

    if let Some(summary) = summary.filter(|s| !s.is_empty()) {
        preview.push_str(&format!("📋 Summary: {}\n\n", summary));
    }

    preview.push_str(&format!("💬 Recent messages ({}):\n", messages.len()));

    let tail = &messages[messages.len().saturating_sub(PREVIEW_TAIL)..];
    for msg in tail {
        let marker = match msg.role {
            Role::User => "👤",
            Role::Assistant | Role::System => "🤖",
        };
        preview.push_str(&format!(
            "{} {}...\n",
            marker,
            take_chars(&msg.content, PREVIEW_CHARS)
        ));
    }

    preview
}
