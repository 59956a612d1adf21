/// Maximum number of characters of passage text shown per human-readable
/// result before truncation.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// The first `max_chars` characters of `text`, followed by `...` when
/// anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// A backtick fence long enough to wrap `text` without being closed early
/// by a fence inside it.
pub fn code_fence(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_short_text_untouched() {
        assert_eq!(excerpt("hello", 500), "hello");
    }

    #[test]
    fn excerpt_exact_length_untouched() {
        let text = "a".repeat(500);
        assert_eq!(excerpt(&text, 500), text);
    }

    #[test]
    fn excerpt_truncates_with_ellipsis() {
        let text = "a".repeat(501);
        let out = excerpt(&text, 500);
        assert_eq!(out.len(), 503);
        assert!(out.ends_with("a..."));
    }

    #[test]
    fn excerpt_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(excerpt(&text, 4), "éééé...");
    }

    #[test]
    fn fence_defaults_to_three_backticks() {
        assert_eq!(code_fence("plain text"), "```");
        assert_eq!(code_fence("inline `code` here"), "```");
    }

    #[test]
    fn fence_outgrows_embedded_fences() {
        assert_eq!(code_fence("```rust\nfn main() {}\n```"), "````");
        assert_eq!(code_fence("`````"), "``````");
    }
}
