//! Session tokens.
//!
//! A session token is an opaque bearer secret handed to the client at login.
//! Only its SHA-256 digest is persisted, so a leaked database does not leak
//! usable sessions.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// A freshly minted session secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a new random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// The secret as sent to the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest stored server-side.
    pub fn hash(&self) -> String {
        hash_session_token(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Never print the secret itself.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Hash a presented token for lookup (lowercase hex SHA-256).
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_url_safe_and_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = hash_session_token("test-admin-token");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_session_token("test-admin-token"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn debug_hides_secret() {
        let token = SessionToken::generate();
        assert!(!format!("{token:?}").contains(token.as_str()));
    }
}
