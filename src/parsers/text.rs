use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Normalizes scraped page text: every whitespace run (newlines included)
/// collapses to one space and the ends are trimmed.
pub fn clean_text(text: &str) -> String {
    match WHITESPACE_RUN.as_ref() {
        Some(regex) => regex.replace_all(text, " ").trim().to_string(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Returns at most `max_chars` characters of `text`, never splitting a
/// character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
