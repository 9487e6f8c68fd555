//! User account domain: membership tiers, account status and field rules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of an email address.
pub const MAX_EMAIL_LEN: usize = 255;

/// Maximum length of a display name.
pub const MAX_NAME_LEN: usize = 255;

/// Minimum password length accepted at registration.
pub const MIN_REGISTRATION_PASSWORD_LEN: usize = 6;

/// Length bounds for a password chosen through the change-password flow.
pub const MIN_NEW_PASSWORD_LEN: usize = 8;
pub const MAX_NEW_PASSWORD_LEN: usize = 100;

/// Membership tier of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipLevel {
    #[default]
    Free,
    Premium,
    Vip,
}

impl MembershipLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            "vip" => Ok(Self::Vip),
            _ => Err(Error::UnknownVariant {
                kind: "membership level",
                value: s.to_string(),
            }),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Vip => "vip",
        }
    }
}

impl fmt::Display for MembershipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an account may sign in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            _ => Err(Error::UnknownVariant {
                kind: "user status",
                value: s.to_string(),
            }),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form used for storing and looking up addresses.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and validate an email address.
///
/// Returns [`normalize_email`] of the input. The check is structural only:
/// one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let len = email.chars().count();
    if !(3..=MAX_EMAIL_LEN).contains(&len) {
        return Err(Error::validation(
            "email",
            format!("must be 3-{MAX_EMAIL_LEN} characters"),
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(Error::validation("email", "must not contain whitespace"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(Error::validation("email", "must contain '@'"));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(Error::validation("email", "invalid address"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(Error::validation("email", "invalid domain"));
    }

    Ok(normalize_email(email))
}

/// Validate a display name, returning it trimmed.
pub fn validate_user_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

/// Validate a password supplied at registration.
pub fn validate_registration_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_REGISTRATION_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_REGISTRATION_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

/// Validate a replacement password: 8-100 characters with a letter and a digit.
pub fn validate_new_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_NEW_PASSWORD_LEN..=MAX_NEW_PASSWORD_LEN).contains(&len) {
        return Err(Error::validation(
            "new_password",
            format!("must be {MIN_NEW_PASSWORD_LEN}-{MAX_NEW_PASSWORD_LEN} characters"),
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(Error::validation(
            "new_password",
            "must contain at least one letter and one digit",
        ));
    }
    Ok(())
}

/// Validate an avatar URL.
pub fn validate_avatar_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !url.chars().any(char::is_whitespace) => Ok(()),
        _ => Err(Error::validation("avatar", "must be an http(s) URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_level_roundtrip() {
        for level in [
            MembershipLevel::Free,
            MembershipLevel::Premium,
            MembershipLevel::Vip,
        ] {
            assert_eq!(MembershipLevel::parse(level.as_str()).unwrap(), level);
        }
        assert!(MembershipLevel::parse("gold").is_err());
        assert_eq!(MembershipLevel::default(), MembershipLevel::Free);
    }

    #[test]
    fn user_status_serializes_lowercase() {
        let json = serde_json::to_string(&UserStatus::Disabled).unwrap();
        assert_eq!(json, "\"disabled\"");
        assert!(UserStatus::Active.is_active());
        assert!(UserStatus::parse("banned").is_err());
    }

    #[test]
    fn email_rules() {
        assert_eq!(
            validate_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("alice@.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn email_normalization_matches_validation() {
        let raw = " Ärger@Example.com ";
        assert_eq!(normalize_email(raw), "ärger@example.com");
        assert_eq!(validate_email(raw).unwrap(), normalize_email(raw));
    }

    #[test]
    fn email_length_counts_characters() {
        // Two bytes per 'é': 207 characters, 407 bytes.
        let email = format!("{}@ex.com", "é".repeat(200));
        assert_eq!(email.chars().count(), 207);
        assert!(email.len() > MAX_EMAIL_LEN);
        assert!(validate_email(&email).is_ok());

        let too_long = format!("{}@ex.com", "é".repeat(249));
        assert!(validate_email(&too_long).is_err());
    }

    #[test]
    fn name_rules() {
        assert_eq!(validate_user_name("  Ada ").unwrap(), "Ada");
        assert!(validate_user_name("   ").is_err());
        assert!(validate_user_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn registration_password_minimum() {
        assert!(validate_registration_password("12345").is_err());
        validate_registration_password("123456").unwrap();
    }

    #[test]
    fn new_password_requires_letter_and_digit() {
        validate_new_password("abcdefg1").unwrap();
        assert!(validate_new_password("abcdefgh").is_err());
        assert!(validate_new_password("12345678").is_err());
        assert!(validate_new_password("abc1").is_err());
        assert!(validate_new_password(&format!("a1{}", "x".repeat(99))).is_err());
    }

    #[test]
    fn avatar_url_rules() {
        validate_avatar_url("https://cdn.example.com/a.png").unwrap();
        validate_avatar_url("http://example.com/a.png").unwrap();
        assert!(validate_avatar_url("ftp://example.com/a.png").is_err());
        assert!(validate_avatar_url("https://").is_err());
        assert!(validate_avatar_url("https://exa mple.com").is_err());
    }
}
