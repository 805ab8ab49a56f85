//! Property tests for context assembly and summary scheduling
//!
//! These exercise the public API the way a chat store drives it: append,
//! check staleness, maybe re-summarize, then build the next context.

use proptest::prelude::*;
use visio_context::{
    build_context, refresh_summary_if_stale, should_update_summary, update_chat_summary,
    MAX_ENTRY_CHARS, RECENT_COUNT, SLICE_SIZE,
};
use visio_protocol::{Chat, Message, Role};

fn tagged_messages(n: usize) -> Vec<Message> {
    (0..n)
        .map(|i| {
            if i % 3 == 2 {
                Message::assistant(format!("#{}", i))
            } else {
                Message::user(format!("#{}", i))
            }
        })
        .collect()
}

fn index_of(content: &str) -> usize {
    content.trim_start_matches('#').parse().unwrap()
}

proptest! {
    #[test]
    fn window_never_repeats_summarized_messages(n in 0usize..60, k in 0usize..60) {
        let messages = tagged_messages(n);
        let context = build_context(&messages, Some("summary"), Some(k));

        for entry in context.iter().filter(|e| e.role != Role::System) {
            let idx = index_of(&entry.content);
            if k < n {
                prop_assert!(idx > k, "index {} at or before watermark {}", idx, k);
            }
        }
    }

    #[test]
    fn window_is_chronological_and_bounded(
        n in 0usize..60,
        k in proptest::option::of(0usize..60),
    ) {
        let messages = tagged_messages(n);
        let context = build_context(&messages, k.map(|_| "summary"), k);

        let indices: Vec<usize> = context
            .iter()
            .filter(|e| e.role != Role::System)
            .map(|e| index_of(&e.content))
            .collect();

        prop_assert!(indices.len() <= RECENT_COUNT);
        prop_assert!(indices.windows(2).all(|w| w[1] == w[0] + 1));
        if let Some(&last) = indices.last() {
            prop_assert_eq!(last, n - 1);
        }
        if let Some(pos) = context.iter().position(|e| e.role == Role::System) {
            prop_assert_eq!(pos, 0);
        }
    }

    #[test]
    fn unsummarized_window_holds_full_tail(n in 0usize..60) {
        let messages = tagged_messages(n);
        let context = build_context(&messages, None, None);
        prop_assert_eq!(context.len(), n.min(RECENT_COUNT));
    }

    #[test]
    fn truncated_entries_never_exceed_ceiling(len in 0usize..3000) {
        let messages = vec![Message::user("b".repeat(len))];
        let context = build_context(&messages, None, None);
        let chars = context[0].content.chars().count();
        if len > MAX_ENTRY_CHARS {
            prop_assert_eq!(chars, MAX_ENTRY_CHARS + 3);
            prop_assert!(context[0].content.ends_with("..."));
        } else {
            prop_assert_eq!(chars, len);
        }
    }

    #[test]
    fn build_is_deterministic(n in 0usize..40, k in proptest::option::of(0usize..40)) {
        let messages = tagged_messages(n);
        prop_assert_eq!(
            build_context(&messages, Some("s"), k),
            build_context(&messages, Some("s"), k)
        );
    }

    #[test]
    fn watermark_is_monotonic_under_appends(appends in 1usize..80) {
        let mut chat = Chat::default();
        let mut previous: Option<usize> = None;

        for i in 0..appends {
            chat.messages.push(Message::user(format!("turn {}", i)));
            refresh_summary_if_stale(&mut chat);

            if let (Some(before), Some(after)) = (previous, chat.last_summarized_index) {
                prop_assert!(after >= before);
            }
            if let Some(k) = chat.last_summarized_index {
                prop_assert!(k < chat.messages.len());
            }
            previous = chat.last_summarized_index;
        }

        let expected = (appends / SLICE_SIZE) * SLICE_SIZE;
        match chat.last_summarized_index {
            Some(k) => prop_assert_eq!(k + 1, expected),
            None => prop_assert!(appends < SLICE_SIZE),
        }
    }
}

#[test]
fn staleness_thresholds() {
    assert!(!should_update_summary(9, None));
    assert!(should_update_summary(10, None));
    assert!(!should_update_summary(14, Some(4)));
    assert!(should_update_summary(15, Some(4)));
}

#[test]
fn resummarizing_twice_is_idempotent() {
    let mut chat = Chat::default();
    chat.messages = tagged_messages(23);

    update_chat_summary(&mut chat);
    let first = (chat.summary.clone(), chat.last_summarized_index);
    update_chat_summary(&mut chat);

    assert_eq!((chat.summary.clone(), chat.last_summarized_index), first);
    assert_eq!(chat.last_summarized_index, Some(22));
}

#[test]
fn long_conversation_keeps_summary_and_recent_turns() {
    let mut chat = Chat::default();
    for i in 0..33 {
        let msg = if i % 2 == 0 {
            Message::user(format!("question about topic {}", i))
        } else {
            Message::assistant(format!("answer {}", i))
        };
        chat.messages.push(msg);
        refresh_summary_if_stale(&mut chat);
    }

    // Watermark advanced at 10, 20 and 30 messages
    assert_eq!(chat.last_summarized_index, Some(29));

    let context = build_context(
        &chat.messages,
        chat.summary.as_deref(),
        chat.last_summarized_index,
    );
    assert_eq!(context.len(), 1 + 3);
    assert_eq!(context[0].role, Role::System);
    assert!(context[0].content.contains("question about topic 0"));
    assert!(!context[0].content.contains("answer"));
    assert_eq!(context[1].content, "question about topic 30");
    assert_eq!(context[3].content, "question about topic 32");
}
