//! Running summary scheduling and generation

use visio_protocol::{Chat, Message, Role};

use crate::truncate::{take_chars, ELLIPSIS};

/// Re-summarization cadence, in messages
pub const SLICE_SIZE: usize = 10;

/// Characters kept from each user message in a topic line
pub const TOPIC_CHARS: usize = 100;

/// Summary length ceiling, in characters, before the ellipsis marker
pub const MAX_SUMMARY_LENGTH: usize = 500;

/// Summarization state of a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryState {
    /// No watermark yet
    Unsummarized,
    /// Every message up to and including this index is folded into the summary
    Summarized(usize),
}

pub fn summary_state(chat: &Chat) -> SummaryState {
    match chat.last_summarized_index {
        Some(index) => SummaryState::Summarized(index),
        None => SummaryState::Unsummarized,
    }
}

/// Whether the running summary is stale after an append.
///
/// Without a watermark the summary is stale once `message_count >= SLICE_SIZE`;
/// with watermark `k`, once `message_count - k - 1 >= SLICE_SIZE`.
pub fn should_update_summary(message_count: usize, last_summarized_index: Option<usize>) -> bool {
    match last_summarized_index {
        None => message_count >= SLICE_SIZE,
        Some(k) => message_count.saturating_sub(k).saturating_sub(1) >= SLICE_SIZE,
    }
}

/// Fold a full message history into condensed topic lines.
///
/// Messages are split into consecutive slices of [`SLICE_SIZE`]. Each slice
/// with at least one user message yields one `Topics discussed: ` line holding
/// the first [`TOPIC_CHARS`] characters of every user message, joined by
/// `"; "`. Assistant and system messages never contribute.
pub fn generate_summary(messages: &[Message]) -> String {
    let lines: Vec<String> = messages
        .chunks(SLICE_SIZE)
        .filter_map(|slice| {
            let topics: Vec<&str> = slice
                .iter()
                .filter(|m| m.role == Role::User)
                .map(|m| take_chars(&m.content, TOPIC_CHARS))
                .collect();

            if topics.is_empty() {
                None
            } else {
                Some(format!("Topics discussed: {}", topics.join("; ")))
            }
        })
        .collect();

    let full = lines.join("\n");
    let capped = take_chars(&full, MAX_SUMMARY_LENGTH);
    if capped.len() < full.len() {
        format!("{}{}", capped, ELLIPSIS)
    } else {
        full
    }
}

/// Recompute the chat's summary from its whole history and advance the
/// watermark to the last message.
///
/// The assignment is absolute, so repeating the call without an intervening
/// append is idempotent. Returns `false` and leaves the chat untouched when
/// there is nothing to summarize or when the existing watermark already lies
/// past the end of the (since shortened) history.
pub fn update_chat_summary(chat: &mut Chat) -> bool {
    let Some(last_index) = chat.messages.len().checked_sub(1) else {
        return false;
    };

    if chat.last_summarized_index.is_some_and(|k| k > last_index) {
        tracing::debug!(
            chat_id = %chat.id,
            watermark = ?chat.last_summarized_index,
            last_index,
            "summary watermark ahead of history, not rewinding"
        );
        return false;
    }

    let summary = generate_summary(&chat.messages);
    tracing::debug!(
        chat_id = %chat.id,
        last_index,
        summary_chars = summary.chars().count(),
        "updated chat summary"
    );

    chat.summary = Some(summary);
    chat.last_summarized_index = Some(last_index);
    chat.touch();
    true
}

/// Run the staleness check and recompute the summary if it fires.
///
/// Called by whatever appends a message, immediately after the append.
pub fn refresh_summary_if_stale(chat: &mut Chat) -> bool {
    if should_update_summary(chat.messages.len(), chat.last_summarized_index) {
        update_chat_summary(chat)
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_with(n: usize) -> Chat {
        let mut chat = Chat::default();
        for i in 0..n {
            chat.messages.push(if i % 2 == 0 {
                Message::user(format!("q{}", i))
            } else {
                Message::assistant(format!("a{}", i))
            });
        }
        chat
    }

    #[test]
    fn test_staleness_unwatermarked() {
        assert!(!should_update_summary(0, None));
        assert!(!should_update_summary(9, None));
        assert!(should_update_summary(10, None));
        assert!(should_update_summary(11, None));
    }

    #[test]
    fn test_staleness_watermarked() {
        assert!(!should_update_summary(14, Some(4)));
        assert!(should_update_summary(15, Some(4)));
        assert!(!should_update_summary(19, Some(9)));
        assert!(should_update_summary(20, Some(9)));
    }

    #[test]
    fn test_staleness_with_watermark_past_count() {
        assert!(!should_update_summary(3, Some(9)));
        assert!(!should_update_summary(3, Some(usize::MAX)));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(generate_summary(&[]), "");
    }

    #[test]
    fn test_user_only_topics() {
        let messages = vec![
            Message::user(format!("hello world {}", "x".repeat(200))),
            Message::assistant("reply"),
            Message::user("second question"),
        ];
        let summary = generate_summary(&messages);
        let expected_first = take_chars(&messages[0].content, TOPIC_CHARS);
        assert_eq!(
            summary,
            format!("Topics discussed: {}; second question", expected_first)
        );
        assert!(!summary.contains("reply"));
    }

    #[test]
    fn test_one_line_per_slice() {
        let chat = chat_with(25);
        let summary = generate_summary(&chat.messages);
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Topics discussed: q0; q2; q4; q6; q8");
        assert_eq!(lines[1], "Topics discussed: q10; q12; q14; q16; q18");
        assert_eq!(lines[2], "Topics discussed: q20; q22; q24");
    }

    #[test]
    fn test_assistant_only_slice_contributes_nothing() {
        let mut messages: Vec<Message> =
            (0..10).map(|i| Message::user(format!("u{}", i))).collect();
        messages.extend((0..10).map(|i| Message::assistant(format!("a{}", i))));
        messages.push(Message::user("tail"));

        let summary = generate_summary(&messages);
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Topics discussed: tail");
    }

    #[test]
    fn test_summary_length_cap() {
        let messages: Vec<Message> =
            (0..40).map(|_| Message::user("z".repeat(100))).collect();
        let summary = generate_summary(&messages);
        assert_eq!(summary.chars().count(), MAX_SUMMARY_LENGTH + ELLIPSIS.len());
        assert!(summary.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_summary_at_cap_is_not_marked() {
        // "Topics discussed: " is 18 chars
        let messages = vec![Message::user("y".repeat(100)); 4];
        let summary = generate_summary(&messages);
        assert!(summary.chars().count() <= MAX_SUMMARY_LENGTH);
        assert!(!summary.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_update_sets_watermark_and_is_idempotent() {
        let mut chat = chat_with(10);
        assert_eq!(summary_state(&chat), SummaryState::Unsummarized);

        assert!(update_chat_summary(&mut chat));
        assert_eq!(summary_state(&chat), SummaryState::Summarized(9));
        let first = chat.summary.clone();

        assert!(update_chat_summary(&mut chat));
        assert_eq!(chat.summary, first);
        assert_eq!(chat.last_summarized_index, Some(9));
    }

    #[test]
    fn test_update_on_empty_chat_is_noop() {
        let mut chat = Chat::default();
        assert!(!update_chat_summary(&mut chat));
        assert!(chat.summary.is_none());
    }

    #[test]
    fn test_update_never_rewinds() {
        let mut chat = chat_with(12);
        update_chat_summary(&mut chat);
        chat.messages.truncate(4);

        assert!(!update_chat_summary(&mut chat));
        assert_eq!(chat.last_summarized_index, Some(11));
    }

    #[test]
    fn test_refresh_follows_state_machine() {
        let mut chat = Chat::default();
        let mut transitions = Vec::new();
        for i in 0..30 {
            chat.messages.push(Message::user(format!("m{}", i)));
            if refresh_summary_if_stale(&mut chat) {
                transitions.push(chat.last_summarized_index);
            }
        }
        assert_eq!(transitions, vec![Some(9), Some(19), Some(29)]);
    }
}
