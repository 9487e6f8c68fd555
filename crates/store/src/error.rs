//! Store error types.

use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Classify a failed write.
    ///
    /// Unique violations become [`StoreError::AlreadyExists`] naming the first
    /// of `fields` mentioned by the driver (SQLite reports `table.column`,
    /// PostgreSQL reports the constraint name). Foreign key violations become
    /// [`StoreError::Constraint`]. Anything else passes through unchanged.
    pub fn from_write(err: sqlx::Error, entity: &str, fields: &[&str]) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let haystack = format!(
                    "{} {}",
                    db_err.message(),
                    db_err.constraint().unwrap_or_default()
                );
                return match fields.iter().find(|f| haystack.contains(*f)) {
                    Some(field) => Self::AlreadyExists(format!("{entity} {field} already exists")),
                    None => Self::AlreadyExists(format!("{entity} already exists")),
                };
            }
            if db_err.is_foreign_key_violation() {
                return Self::Constraint(format!("{entity} references a missing record"));
            }
        }
        Self::Database(err)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn non_database_errors_pass_through() {
        let err = StoreError::from_write(sqlx::Error::RowNotFound, "tag", &["slug"]);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
