//! Char-safe truncation and token estimation

use std::borrow::Cow;

/// Marker appended to any text shortened by truncation
pub const ELLIPSIS: &str = "...";

/// Longest prefix of `text` holding at most `max_chars` Unicode scalar values
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Truncate `text` to `max_chars` characters, appending [`ELLIPSIS`] when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
    let prefix = take_chars(text, max_chars);
    if prefix.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}{}", prefix, ELLIPSIS))
    }
}

/// Estimate tokens for a string (~4 chars per token, rounded up)
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_chars_respects_char_boundaries() {
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("日本語テキスト", 3), "日本語");
        assert_eq!(take_chars("short", 100), "short");
        assert_eq!(take_chars("", 3), "");
    }

    #[test]
    fn test_truncate_exact_length_is_untouched() {
        let text = "a".repeat(10);
        assert!(matches!(truncate_with_ellipsis(&text, 10), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_appends_marker() {
        let text = "a".repeat(11);
        let out = truncate_with_ellipsis(&text, 10);
        assert_eq!(out, format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn test_estimate_tokens() {
        // 20 chars should be 5 tokens
        assert_eq!(estimate_tokens("12345678901234567890"), 5);
        assert_eq!(estimate_tokens("12345"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}
