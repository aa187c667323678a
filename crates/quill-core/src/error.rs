//! Error types for quill.

use thiserror::Error;

/// Result type alias using quill's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quill operations.
///
/// Every "absent or not owned by the caller" case collapses into the same
/// variant per resource, so a lookup never reveals whether the resource
/// exists under a different account.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note absent or owned by another account
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// Tag absent or owned by another account
    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    /// Username already registered
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Tag label already exists for this account
    #[error("Tag label already exists: {0}")]
    DuplicateLabel(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_note_not_found() {
        let err = Error::NoteNotFound(42);
        assert_eq!(err.to_string(), "Note not found: 42");
    }

    #[test]
    fn test_error_display_tag_not_found() {
        let err = Error::TagNotFound(7);
        assert_eq!(err.to_string(), "Tag not found: 7");
    }

    #[test]
    fn test_error_display_duplicate_username() {
        let err = Error::DuplicateUsername("ferris".to_string());
        assert_eq!(err.to_string(), "Username already taken: ferris");
    }

    #[test]
    fn test_error_display_duplicate_label() {
        let err = Error::DuplicateLabel("work".to_string());
        assert_eq!(err.to_string(), "Tag label already exists: work");
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("invalid token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: invalid token");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::InvalidInput(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
