//! URL slugs for documents, categories and tags.

use crate::error::{Error, Result};

/// Maximum slug length for documents and categories.
pub const MAX_SLUG_LEN: usize = 100;

/// Maximum slug length for tags.
pub const MAX_TAG_SLUG_LEN: usize = 50;

/// Validate a slug: 1..=`max_len` characters drawn from `[a-z0-9-]`.
pub fn validate_slug(slug: &str, max_len: usize) -> Result<()> {
    if slug.is_empty() || slug.len() > max_len {
        return Err(Error::validation(
            "slug",
            format!("must be 1-{max_len} characters"),
        ));
    }
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(Error::validation(
            "slug",
            "may only contain lowercase letters, digits and hyphens",
        ));
    }
    Ok(())
}

/// Derive a slug from a display name.
///
/// Lowercases, turns each whitespace run into a single `-`, then drops every
/// character outside `[a-z0-9-]`. The result may be empty for names made
/// entirely of symbols or non-ASCII text.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        validate_slug("rust-2024", MAX_SLUG_LEN).unwrap();
        validate_slug("a", MAX_TAG_SLUG_LEN).unwrap();
        assert!(validate_slug("", MAX_SLUG_LEN).is_err());
        assert!(validate_slug("Upper", MAX_SLUG_LEN).is_err());
        assert!(validate_slug("under_score", MAX_SLUG_LEN).is_err());
        assert!(validate_slug("with space", MAX_SLUG_LEN).is_err());
        assert!(validate_slug(&"a".repeat(51), MAX_TAG_SLUG_LEN).is_err());
        validate_slug(&"a".repeat(100), MAX_SLUG_LEN).unwrap();
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust   &  Tokio "), "rust--tokio");
        assert_eq!(slugify("C++"), "c");
        assert_eq!(slugify("web-dev"), "web-dev");
        assert_eq!(slugify("数据库"), "");
    }
}
