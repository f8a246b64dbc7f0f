//! Error types for notekeep.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using notekeep's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when a save is attempted with a blank title or content.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Title and content are required";

/// Core error type for notekeep operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage backend failed for a reason other than the database driver
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found, or not owned by the caller
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    /// Input rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique constraint hit on insert
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The stored note changed since the caller last saw it
    #[error("Conflict: note {note_id} is at version {actual}, expected {expected}")]
    Conflict {
        note_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// Title/content were written, tag reconciliation failed afterwards
    #[error("Note saved but tags were not updated: {source}")]
    PartialReconciliation {
        note_id: Uuid,
        version: i64,
        created: bool,
        #[source]
        source: Box<Error>,
    },

    /// No authenticated user
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(_) | Error::Storage(_) => true,
            Error::PartialReconciliation { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Whether this is the "missing or not yours" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NoteNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_note_not_found() {
        let id = Uuid::nil();
        let err = Error::NoteNotFound(id);
        assert_eq!(err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation(REQUIRED_FIELDS_MESSAGE.to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Title and content are required"
        );
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict {
            note_id: Uuid::nil(),
            expected: 2,
            actual: 3,
        };
        assert!(err.to_string().contains("version 3, expected 2"));
    }

    #[test]
    fn test_partial_reconciliation_keeps_source() {
        let err = Error::PartialReconciliation {
            note_id: Uuid::nil(),
            version: 1,
            created: true,
            source: Box::new(Error::Storage("tag table locked".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Note saved but tags were not updated: Storage error: tag table locked"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Storage("timeout".into()).is_transient());
        assert!(!Error::NoteNotFound(Uuid::nil()).is_transient());
        assert!(!Error::Validation("blank".into()).is_transient());

        let partial = Error::PartialReconciliation {
            note_id: Uuid::nil(),
            version: 1,
            created: false,
            source: Box::new(Error::Storage("timeout".into())),
        };
        assert!(partial.is_transient());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::NoteNotFound(Uuid::nil()).is_not_found());
        assert!(Error::NotFound("tag".into()).is_not_found());
        assert!(!Error::Internal("x".into()).is_not_found());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
