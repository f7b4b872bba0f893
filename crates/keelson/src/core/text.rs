//! Text helpers for labels and plain-text tables
//!
//! Widths are measured in terminal columns, not bytes or chars.

use unicode_width::UnicodeWidthStr;

/// Display width of `text` in terminal columns
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Pad `text` with spaces on the right up to `width` columns
pub fn pad_right(text: &str, width: usize) -> String {
    let mut padded = text.to_string();
    let current = display_width(text);
    if current < width {
        padded.push_str(&" ".repeat(width - current));
    }
    padded
}

/// Wrap text on word boundaries so no line exceeds `max_width` columns.
///
/// A single word wider than `max_width` keeps its own line. `max_width == 0`
/// disables wrapping.
///
/// # Example
/// ```
/// use keelson::core::wrap_label;
///
/// let lines = wrap_label("entry / start the motor", 12);
/// assert_eq!(lines, vec!["entry /", "start the", "motor"]);
/// ```
pub fn wrap_label(label: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 || display_width(label) <= max_width {
        return vec![label.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in label.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if display_width(&current) + 1 + display_width(word) <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_right_uses_columns() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("abcdef", 4), "abcdef");
        // Wide glyphs count double
        assert_eq!(pad_right("日本", 6), "日本  ");
    }

    #[test]
    fn test_wrap_short_label() {
        assert_eq!(wrap_label("Idle", 10), vec!["Idle"]);
        assert_eq!(wrap_label("anything at all", 0), vec!["anything at all"]);
    }

    #[test]
    fn test_wrap_long_word() {
        assert_eq!(
            wrap_label("a verylongwordhere b", 5),
            vec!["a", "verylongwordhere", "b"]
        );
    }

    #[test]
    fn test_wrap_whitespace_only() {
        assert_eq!(wrap_label("          ", 3), vec![""]);
    }
}
