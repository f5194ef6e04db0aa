//! Message handlers: history, send and mark-read.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hirechat_types::conversation::ConversationId;
use hirechat_types::message::Message;

use super::parse_path_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Identity;
use crate::http::extractors::query::MessageListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for sending a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ReadReceipt {
    pub conversation_id: ConversationId,
    /// The caller's read cursor after the update.
    pub last_read_at: DateTime<Utc>,
}

/// GET /api/v1/conversations/{id}/messages - History ordered by
/// `(created_at, id)`.
pub async fn list_messages(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Query(params): Query<MessageListQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id: ConversationId = parse_path_id(&id, "conversation")?;
    let query = params.into_query()?;

    let messages = state
        .messaging
        .list_messages(&caller, &conversation_id, &query)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(messages, request_id, elapsed)))
}

/// POST /api/v1/conversations/{id}/messages - Append a message.
///
/// Succeeds once the message is stored, even if real-time delivery fails.
pub async fn send_message(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id: ConversationId = parse_path_id(&id, "conversation")?;

    let message = state
        .messaging
        .send_message(&caller, &conversation_id, &request.body)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(message, request_id, elapsed)))
}

/// POST /api/v1/conversations/{id}/read - Mark everything so far as read.
pub async fn mark_read(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReadReceipt>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let conversation_id: ConversationId = parse_path_id(&id, "conversation")?;

    let last_read_at = state.messaging.mark_read(&caller, &conversation_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        ReadReceipt {
            conversation_id,
            last_read_at,
        },
        request_id,
        elapsed,
    )))
}
