/// WebSocket chat relay
///
/// # Endpoint
///
/// ```text
/// GET /ws/chat/:task_id/:user_id?token=<jwt>
/// ```
///
/// The token may also be sent as a bearer header. The upgrade is refused
/// unless the token's user is `user_id` and a participant of the task.
///
/// # Frames
///
/// Client to server:
///
/// ```json
/// {"content": "I'm outside", "receiver_id": "<uuid>"}
/// {"type": "ping"}
/// ```
///
/// Server to client: `message_sent` (to the sender), `new_message` (to the
/// receiver's sockets), `error`, `pong`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{load_task, messages},
    ws::{ChatConnection, ServerFrame},
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use taskafy_shared::auth::middleware;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    pub token: Option<String>,
}

/// Frames accepted from clients
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientFrame {
    Control {
        #[serde(rename = "type")]
        kind: String,
    },
    Send {
        content: String,
        receiver_id: Uuid,
    },
}

pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((task_id, user_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ChatQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => middleware::bearer_token(&headers)?
            .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?,
    };

    let auth = middleware::authenticate(&state.db, state.jwt_secret(), token).await?;
    if auth.user_id != user_id {
        return Err(ApiError::Forbidden("Token does not match user".to_string()));
    }

    let task = load_task(&state.db, task_id).await?;
    if !task.is_participant(user_id) {
        return Err(ApiError::Forbidden("Not a participant of this task".to_string()));
    }

    let connection = state.chat.register(task_id, user_id);

    tracing::info!(task_id = %task_id, user_id = %user_id, "Chat socket opened");

    Ok(ws.on_upgrade(move |socket| run(socket, state, task_id, user_id, connection)))
}

/// Drives one socket until either side closes
async fn run(
    socket: WebSocket,
    state: AppState,
    task_id: Uuid,
    user_id: Uuid,
    mut connection: ChatConnection,
) {
    let (mut sink, mut stream) = socket.split();

    let Some(mut outbox) = connection.take_inbox() else {
        return;
    };

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(incoming) = stream.next().await {
        let text = match incoming {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, user_id = %user_id, "Chat socket read failed");
                break;
            }
        };

        if let Some(reply) = handle_frame(&state, task_id, user_id, &text).await {
            connection.reply(&reply);
        }
    }

    // Dropping the registration closes the outbox, which ends the writer
    drop(connection);
    let _ = writer.await;

    tracing::info!(task_id = %task_id, user_id = %user_id, "Chat socket closed");
}

/// Processes one client frame and returns the reply for the sender
///
/// Participation is re-checked on every send; the socket may outlive the
/// sender's place on the task.
async fn handle_frame(state: &AppState, task_id: Uuid, user_id: Uuid, text: &str) -> Option<ServerFrame> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(_) => return Some(ServerFrame::error("Invalid message format")),
    };

    match frame {
        ClientFrame::Control { kind } if kind == "ping" => Some(ServerFrame::Pong),
        ClientFrame::Control { kind } => {
            Some(ServerFrame::error(format!("Unknown frame type: {}", kind)))
        }
        ClientFrame::Send {
            content,
            receiver_id,
        } => match messages::deliver(state, task_id, user_id, Some(receiver_id), &content).await {
            Ok(message) => Some(ServerFrame::MessageSent { message }),
            Err(ApiError::ValidationError(details)) => Some(ServerFrame::error(
                details
                    .first()
                    .map(|d| d.message.clone())
                    .unwrap_or_else(|| "Invalid message".to_string()),
            )),
            Err(ApiError::BadRequest(message) | ApiError::Forbidden(message) | ApiError::NotFound(message)) => {
                Some(ServerFrame::error(message))
            }
            Err(e) => {
                tracing::error!(error = %e, task_id = %task_id, "Failed to store chat message");
                Some(ServerFrame::error("Failed to send message"))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_shapes() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Control { kind } if kind == "ping"));

        let receiver = Uuid::new_v4();
        let raw = format!(r#"{{"content": "hello", "receiver_id": "{}"}}"#, receiver);
        let frame: ClientFrame = serde_json::from_str(&raw).unwrap();
        assert!(matches!(
            frame,
            ClientFrame::Send { content, receiver_id } if content == "hello" && receiver_id == receiver
        ));

        assert!(serde_json::from_str::<ClientFrame>(r#"{"content": "missing receiver"}"#).is_err());
    }
}
