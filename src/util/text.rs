use std::borrow::Cow;

/// Average adult reading speed used for story read-time estimates.
const WORDS_PER_MINUTE: usize = 200;

/// Strip ASCII control characters from user-entered text.
///
/// Removes 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F and 0x7F. Preserves tab, newline
/// and carriage return so multi-line posts keep their shape.
///
/// Returns `Cow::Borrowed` when the input is already clean (the common case).
///
/// # Examples
///
/// ```
/// use farmfeed::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain text"), "plain text");
/// assert_eq!(strip_control_chars("bell\x07 here"), "bell here");
/// assert_eq!(strip_control_chars("line one\nline two"), "line one\nline two");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_stripped = |c: char| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r');

    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_stripped(c)).collect())
}

/// Case-insensitive substring test.
///
/// `needle_lower` must already be lowercased; callers filtering many records
/// lowercase the search term once instead of per comparison.
///
/// An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(needle_lower)
}

/// Estimated reading time in whole minutes, rounded up, minimum 1.
///
/// # Examples
///
/// ```
/// use farmfeed::util::read_time_minutes;
///
/// assert_eq!(read_time_minutes(""), 1);
/// assert_eq!(read_time_minutes(&"word ".repeat(200)), 1);
/// assert_eq!(read_time_minutes(&"word ".repeat(201)), 2);
/// ```
pub fn read_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
