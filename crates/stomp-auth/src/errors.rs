//! Credential store error types.

/// Errors raised while opening or querying a credential store.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// `SQLite` failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored column value could not be decoded.
    #[error("corrupt {column} value in login history: {detail}")]
    CorruptRow {
        /// Offending column.
        column: &'static str,
        /// Raw value or decode failure.
        detail: String,
    },
}

/// Result type for credential store operations.
pub type Result<T> = std::result::Result<T, AuthError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = AuthError::from(io_err);
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn corrupt_row_display() {
        let err = AuthError::CorruptRow {
            column: "login_time",
            detail: "yesterday".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt login_time value in login history: yesterday"
        );
    }

    #[test]
    fn sqlite_error_conversion() {
        let err = AuthError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().starts_with("SQLite error"));
    }
}
