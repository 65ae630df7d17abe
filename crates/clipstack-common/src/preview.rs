/// Preview length used when nothing else is configured.
pub const DEFAULT_PREVIEW_LENGTH: usize = 65;

/// One-line preview of a history entry, at most `max` characters.
///
/// Multi-line entries show the start of the first line, a return marker and
/// the start of the second line.
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or("");

    match lines.next() {
        Some(second) => {
            let preview = format!("{} ⏎ {}", take(first, max), take(second, 15));
            if preview.chars().count() > max {
                ellipsize(&preview, max)
            } else {
                preview
            }
        }
        None if text.chars().count() <= max => text.to_string(),
        None => ellipsize(text, max),
    }
}

fn take(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn ellipsize(s: &str, max: usize) -> String {
    let mut out = take(s, max.saturating_sub(3));
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate("  hello  ", 65), "hello");
    }

    #[test]
    fn test_long_text_cut() {
        let out = truncate(&"a".repeat(100), 65);
        assert_eq!(out.chars().count(), 65);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_multiline_marker() {
        assert_eq!(truncate("first\nsecond line\nthird", 65), "first ⏎ second line");
    }

    #[test]
    fn test_multiline_long_first_line() {
        let text = format!("{}\nmore", "x".repeat(70));
        let out = truncate(&text, 65);
        assert_eq!(out.chars().count(), 65);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let out = truncate(&"é".repeat(10), 8);
        assert_eq!(out, "ééééé...");
    }
}
