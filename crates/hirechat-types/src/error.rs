use thiserror::Error;

/// Errors from repository operations (used by trait definitions in hirechat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the messaging API.
///
/// Validation and permission failures are always returned as values so the
/// caller can show an inline error tied to the specific failure kind.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("no authenticated identity")]
    NotAuthenticated,

    #[error("caller is not a participant of this conversation")]
    PermissionDenied,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MessagingError {
    pub fn conversation_not_found() -> Self {
        MessagingError::NotFound("conversation".to_string())
    }

    pub fn application_not_found() -> Self {
        MessagingError::NotFound("application".to_string())
    }
}

/// Failure to hand an event to the real-time bus.
///
/// The message is already durably stored when this happens, so it only
/// delays real-time notification.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("event bus unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_messaging_error_wraps_repository_error() {
        let err: MessagingError = RepositoryError::Connection.into();
        assert!(matches!(err, MessagingError::Repository(_)));
        assert_eq!(err.to_string(), "database connection error");
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            MessagingError::conversation_not_found().to_string(),
            "conversation not found"
        );
    }
}
