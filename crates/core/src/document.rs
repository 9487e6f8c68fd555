//! Document field rules.

use crate::error::{Error, Result};

pub const MAX_TITLE_LEN: usize = 200;

/// Characters of content used when a document has no excerpt.
pub const FEED_EXCERPT_LEN: usize = 200;

/// Validate a document title, returning it trimmed.
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title.to_string())
}

/// Normalize a comma separated keyword list: trims entries, drops empties.
pub fn normalize_keywords(keywords: &str) -> Option<String> {
    let parts: Vec<&str> = keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

/// Summary text for listings and feeds: the excerpt when present, otherwise
/// the first `max_chars` characters of the content.
pub fn excerpt_or_prefix(excerpt: Option<&str>, content: &str, max_chars: usize) -> String {
    match excerpt.map(str::trim) {
        Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
        _ => content.chars().take(max_chars).collect(),
    }
}
