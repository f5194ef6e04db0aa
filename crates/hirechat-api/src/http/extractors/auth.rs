//! Session authentication extractor.
//!
//! Extracts a session token from:
//! - `Authorization: Bearer <token>` header
//! - `X-Session-Token: <token>` header
//! - `access_token=<token>` query parameter (WebSocket clients cannot set headers)
//!
//! Tokens are SHA-256 hashed and resolved against the `user_sessions` table.
//! An optional role hint is read from `X-Role-Hint` or `role_hint=`; it is
//! carried on the caller but never used for authorization.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use hirechat_core::messaging::Caller;
use hirechat_types::error::MessagingError;
use hirechat_types::identity::ParticipantRole;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Identity(pub Caller);

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(MessagingError::NotAuthenticated)?;
        let user_id = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or(MessagingError::NotAuthenticated)?;

        Ok(Identity(Caller::new(user_id).with_role_hint(extract_role_hint(parts))))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn query_param(parts: &Parts, name: &str) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// Extract the session token from headers or the query string.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(token) = header_str(parts, "authorization").and_then(|v| v.strip_prefix("Bearer ")) {
        return Some(token.trim().to_string());
    }
    if let Some(token) = header_str(parts, "x-session-token") {
        return Some(token.to_string());
    }
    query_param(parts, "access_token")
}

/// Unparseable hints are dropped; a hint can only ever affect display.
fn extract_role_hint(parts: &Parts) -> Option<ParticipantRole> {
    let raw = header_str(parts, "x-role-hint")
        .map(str::to_string)
        .or_else(|| query_param(parts, "role_hint"))?;
    match raw.parse() {
        Ok(role) => Some(role),
        Err(e) => {
            debug!(hint = %raw, error = %e, "ignoring role hint");
            None
        }
    }
}
