//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl Error {
    /// Shorthand for a field validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input (as opposed to a server fault).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::PasswordHash(_))
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
