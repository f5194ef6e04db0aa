//! HTTP request handlers for the REST and WebSocket API.

use std::str::FromStr;

use crate::http::error::AppError;

pub mod conversation;
pub mod message;
pub mod ws;

/// Parse a path segment into a typed identifier.
pub(crate) fn parse_path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid {what} ID: {raw}")))
}
