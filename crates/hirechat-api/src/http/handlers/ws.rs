//! WebSocket handler for live conversation updates.
//!
//! The `/ws/conversations/{id}` endpoint upgrades an authenticated
//! participant's connection and runs a [`ConversationSession`] for it:
//!
//! - **Forwards updates:** every message the session delivers (backfill and
//!   live, deduplicated) is pushed as a `message_appended` frame, and every
//!   connection-state change as a `connection_state` frame.
//! - **Receives commands:** `focus` toggles whether the viewer is looking at
//!   the conversation (while focused, peer messages are marked read as they
//!   arrive), `mark_read` marks everything read, `ping` is answered with
//!   `pong`.
//!
//! Closing the socket closes the session and releases its topic
//! subscription.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hirechat_core::event::{ConversationSession, SessionHandle, SessionUpdate};
use hirechat_core::messaging::{Caller, ParticipantBackend};
use hirechat_types::conversation::ConversationId;
use hirechat_types::event::ConnectionState;
use hirechat_types::message::Message;

use super::parse_path_id;
use crate::http::error::AppError;
use crate::http::extractors::auth::Identity;
use crate::state::AppState;

/// Incoming frame from a WebSocket client.
///
/// Unknown or malformed frames are logged and ignored.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Focus { active: bool },
    MarkRead,
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
}

/// Outgoing frame to a WebSocket client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    MessageAppended { message: Message },
    ConnectionState { state: ConnectionState },
    Pong,
}

impl From<SessionUpdate> for ServerFrame {
    fn from(update: SessionUpdate) -> Self {
        match update {
            SessionUpdate::Message(message) => ServerFrame::MessageAppended { message },
            SessionUpdate::State(state) => ServerFrame::ConnectionState { state },
        }
    }
}

/// GET /ws/conversations/{id} - Upgrade to a live conversation session.
///
/// Non-participants are refused before the upgrade.
pub async fn conversation_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation_id: ConversationId = parse_path_id(&id, "conversation")?;
    state
        .messaging
        .get_conversation(&caller, &conversation_id)
        .await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, caller, conversation_id)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    caller: Caller,
    conversation_id: ConversationId,
) {
    let viewer = caller.user_id;
    let backend = ParticipantBackend::new(state.messaging.clone(), caller);
    let (handle, mut updates) =
        ConversationSession::spawn(conversation_id, viewer, backend, &state.config);
    let (mut ws_sender, mut ws_receiver) = socket.split();
    info!(%conversation_id, %viewer, "websocket session opened");

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else {
                    break;
                };
                if send_frame(&mut ws_sender, &ServerFrame::from(update)).await.is_err() {
                    break;
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if process_frame(&text, &handle, &mut ws_sender).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!(error = %err, "websocket receive error");
                        break;
                    }
                    // Binary and protocol-level ping/pong frames are handled by axum.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(updates);
    handle.close().await;
    info!(%conversation_id, %viewer, "websocket session closed");
}

async fn send_frame(
    ws_sender: &mut (impl SinkExt<WsMessage, Error = axum::Error> + Unpin),
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(json) => ws_sender.send(WsMessage::Text(json.into())).await,
        Err(err) => {
            warn!(error = %err, "failed to serialize websocket frame");
            Ok(())
        }
    }
}

/// Parse and apply a single frame from the client.
async fn process_frame(
    text: &str,
    handle: &SessionHandle,
    ws_sender: &mut (impl SinkExt<WsMessage, Error = axum::Error> + Unpin),
) -> Result<(), axum::Error> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(raw = %text, error = %err, "ignoring malformed websocket frame");
            return Ok(());
        }
    };

    match frame {
        ClientFrame::Focus { active } => handle.set_active(active),
        ClientFrame::MarkRead => handle.mark_read(),
        ClientFrame::Ping => return send_frame(ws_sender, &ServerFrame::Pong).await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hirechat_types::identity::UserId;
    use hirechat_types::message::MessageId;

    #[test]
    fn test_client_frames_parse() {
        assert_eq!(
            serde_json::from_str::<ClientFrame>(r#"{"type":"focus","active":true}"#).unwrap(),
            ClientFrame::Focus { active: true }
        );
        assert_eq!(
            serde_json::from_str::<ClientFrame>(r#"{"type":"mark_read"}"#).unwrap(),
            ClientFrame::MarkRead
        );
        assert_eq!(
            serde_json::from_str::<ClientFrame>(r#"{"type":"ping"}"#).unwrap(),
            ClientFrame::Ping
        );
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"typing"}"#).is_err());
    }

    #[test]
    fn test_server_frames_are_tagged() {
        let message = Message {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            sender_id: UserId::new(),
            body: "hello".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(ServerFrame::from(SessionUpdate::Message(message.clone())))
            .unwrap();
        assert_eq!(json["type"], "message_appended");
        assert_eq!(json["message"]["body"], "hello");
        assert_eq!(json["message"]["id"], message.id.to_string());

        let json =
            serde_json::to_value(ServerFrame::from(SessionUpdate::State(ConnectionState::Subscribed)))
                .unwrap();
        assert_eq!(json["type"], "connection_state");
        assert_eq!(json["state"], "subscribed");

        assert_eq!(serde_json::to_string(&ServerFrame::Pong).unwrap(), r#"{"type":"pong"}"#);
    }
}
