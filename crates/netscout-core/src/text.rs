//! Small string helpers shared by the tools.

/// Suffix appended to truncated page text.
pub const TRUNCATED_INLINE: &str = "... [truncated]";

/// Suffix appended to truncated Markdown and PDF text.
pub const TRUNCATED_BLOCK: &str = "\n\n... [truncated]";

/// Prefix `https://` when `url` has no `http://` or `https://` scheme.
///
/// ```rust
/// use netscout_core::text::with_scheme;
///
/// assert_eq!(with_scheme("example.com"), "https://example.com");
/// assert_eq!(with_scheme("http://example.com"), "http://example.com");
/// ```
pub fn with_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Keep at most `max_chars` characters of `text`.
///
/// Cuts on a char boundary. Returns a borrowed slice.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate `text` to `max_chars` characters, appending `suffix` only when
/// something was cut.
///
/// ```rust
/// use netscout_core::text::{truncate_with_suffix, TRUNCATED_INLINE};
///
/// assert_eq!(truncate_with_suffix("héllo world", 5, TRUNCATED_INLINE), "héllo... [truncated]");
/// assert_eq!(truncate_with_suffix("short", 5, TRUNCATED_INLINE), "short");
/// ```
pub fn truncate_with_suffix(text: &str, max_chars: usize, suffix: &str) -> String {
    let kept = take_chars(text, max_chars);
    if kept.len() == text.len() {
        text.to_string()
    } else {
        format!("{kept}{suffix}")
    }
}

/// Join the whitespace-separated words of `text` with single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join text fragments with single spaces, trimming each and skipping blanks.
pub fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
