//! Conversation handlers: open, inbox and detail.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use uuid::Uuid;

use hirechat_types::conversation::{Conversation, ConversationId, InboxEntry};
use hirechat_types::identity::{ApplicationId, ParticipantRole};

use super::parse_path_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Identity;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// A conversation as seen by one participant.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    /// The caller's role, derived from the stored participant pair.
    pub role: ParticipantRole,
    /// Set when the client's role hint disagreed with `role`.
    pub hint_stale: bool,
    pub unread_count: u32,
}

fn messages_link(id: &ConversationId) -> String {
    format!("/api/v1/conversations/{id}/messages")
}

/// POST /api/v1/applications/{id}/conversation - Open (or reopen) the
/// conversation for a job application. Employer only.
pub async fn open_conversation(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(application_id): Path<String>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let application_id: ApplicationId = parse_path_id(&application_id, "application")?;

    let conversation = state
        .messaging
        .open_conversation(&caller, &application_id)
        .await?;

    let link = messages_link(&conversation.id);
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(conversation, request_id, elapsed).with_link("messages", &link),
    ))
}

/// GET /api/v1/conversations - The caller's inbox, newest activity first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Identity(caller): Identity,
) -> Result<Json<ApiResponse<Vec<InboxEntry>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let inbox = state.messaging.list_conversations(&caller.user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(inbox, request_id, elapsed)))
}

/// GET /api/v1/conversations/{id} - One conversation with the caller's role
/// and unread count.
pub async fn get_conversation(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ConversationView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id: ConversationId = parse_path_id(&id, "conversation")?;

    let authorized = state
        .messaging
        .get_conversation(&caller, &conversation_id)
        .await?;
    let unread_count = state
        .messaging
        .unread_count(&caller.user_id, &conversation_id)
        .await?;

    let view = ConversationView {
        conversation: authorized.conversation,
        role: authorized.role,
        hint_stale: authorized.hint_stale,
        unread_count,
    };
    let link = messages_link(&conversation_id);
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(view, request_id, elapsed).with_link("messages", &link),
    ))
}
