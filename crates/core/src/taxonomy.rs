//! Categories and tags.

use crate::error::{Error, Result};

/// Color assigned to a category when none is given.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

/// Color assigned to a tag when none is given.
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

pub const MAX_CATEGORY_NAME_LEN: usize = 100;
pub const MAX_TAG_NAME_LEN: usize = 50;

/// Validate a `#RRGGBB` hex color.
pub fn validate_color(color: &str) -> Result<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(Error::validation("color", "must be a #RRGGBB hex color"))
    }
}

/// Validate a category name, returning it trimmed.
pub fn validate_category_name(name: &str) -> Result<String> {
    validate_name(name, MAX_CATEGORY_NAME_LEN)
}

/// Validate a tag name, returning it trimmed.
pub fn validate_tag_name(name: &str) -> Result<String> {
    validate_name(name, MAX_TAG_NAME_LEN)
}

fn validate_name(name: &str, max_len: usize) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > max_len {
        return Err(Error::validation(
            "name",
            format!("must be 1-{max_len} characters"),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        validate_color(DEFAULT_CATEGORY_COLOR).unwrap();
        validate_color(DEFAULT_TAG_COLOR).unwrap();
        validate_color("#abcdef").unwrap();
        assert!(validate_color("3B82F6").is_err());
        assert!(validate_color("#3B82F").is_err());
        assert!(validate_color("#GGGGGG").is_err());
        assert!(validate_color("#3B82F6FF").is_err());
    }

    #[test]
    fn name_limits() {
        assert_eq!(validate_tag_name(" rust ").unwrap(), "rust");
        assert!(validate_tag_name(&"t".repeat(51)).is_err());
        validate_category_name(&"c".repeat(100)).unwrap();
        assert!(validate_category_name(&"c".repeat(101)).is_err());
        assert!(validate_category_name("").is_err());
    }
}
