//! Excerpt helper for report rows.

/// Whitespace-normalized excerpt capped at `max_chars`, or `None` when the
/// text is effectively empty.
#[must_use]
pub fn derive_excerpt(text: &str, max_chars: usize) -> Option<String> {
    if max_chars == 0 {
        return None;
    }

    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return None;
    }

    if normalized.chars().count() <= max_chars {
        return Some(normalized);
    }

    let mut excerpt: String = normalized.chars().take(max_chars).collect();
    excerpt.push_str("...");
    Some(excerpt)
}

#[cfg(test)]
mod tests {
    use super::derive_excerpt;

    #[test]
    fn normalizes_whitespace_and_truncates() {
        assert_eq!(
            derive_excerpt("a  b\n\nc", 10).as_deref(),
            Some("a b c")
        );
        assert_eq!(derive_excerpt("abcdef", 4).as_deref(), Some("abcd..."));
    }

    #[test]
    fn empty_inputs_have_no_excerpt() {
        assert!(derive_excerpt("   \n ", 10).is_none());
        assert!(derive_excerpt("text", 0).is_none());
    }
}
