//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use hirechat_types::error::{MessagingError, RepositoryError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the messaging service.
    Messaging(MessagingError),
    /// Malformed path or query input.
    Validation(String),
}

impl From<MessagingError> for AppError {
    fn from(e: MessagingError) -> Self {
        AppError::Messaging(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Messaging(MessagingError::Repository(e))
    }
}

impl AppError {
    /// Status, machine-readable code and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Messaging(MessagingError::NotAuthenticated) => (
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                "Authentication required".to_string(),
            ),
            AppError::Messaging(MessagingError::PermissionDenied) => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "You are not a participant of this conversation".to_string(),
            ),
            AppError::Messaging(MessagingError::Validation(msg)) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Messaging(MessagingError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"))
            }
            AppError::Messaging(MessagingError::Repository(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if let AppError::Messaging(e @ MessagingError::Repository(_)) = &self {
            error!(error = %e, "request failed");
        }

        (status, ApiResponse::error(code, &message, String::new(), 0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_maps_to_status_codes() {
        let cases = [
            (AppError::from(MessagingError::NotAuthenticated), StatusCode::UNAUTHORIZED),
            (AppError::from(MessagingError::PermissionDenied), StatusCode::FORBIDDEN),
            (
                AppError::from(MessagingError::Validation("empty".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(MessagingError::conversation_not_found()),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(RepositoryError::Connection),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.parts().0, expected);
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::from(RepositoryError::Query("no such table: messages".into()));
        let (_, code, message) = err.parts();
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("messages"));
    }

    #[test]
    fn test_not_found_names_the_entity() {
        let (_, code, message) = AppError::from(MessagingError::application_not_found()).parts();
        assert_eq!(code, "NOT_FOUND");
        assert_eq!(message, "application not found");
    }
}
