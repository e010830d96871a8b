/// Task messaging over HTTP
///
/// Messages sent here are also pushed to the receiver's open chat sockets,
/// so both transports see the same conversation.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{load_task, notify},
    ws::ServerFrame,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{authorization::require_participant, middleware::AuthContext},
    models::{
        message::{self, Message},
        notification::NotificationKind,
    },
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub task_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

/// Stores a message from `sender_id` to the other participant and relays it
///
/// The task is reloaded on every call, so a tasker released from the task
/// can no longer send. When `receiver_id` is given it must be the current
/// counterpart. Pushes a `new_message` frame to the receiver's sockets and
/// leaves a notification. Shared by the HTTP route and the chat socket.
pub(crate) async fn deliver(
    state: &AppState,
    task_id: Uuid,
    sender_id: Uuid,
    receiver_id: Option<Uuid>,
    content: &str,
) -> ApiResult<Message> {
    let task = load_task(&state.db, task_id).await?;
    if !task.is_participant(sender_id) {
        return Err(ApiError::Forbidden("Not a participant of this task".to_string()));
    }

    let counterpart = task.counterpart_of(sender_id).ok_or_else(|| {
        ApiError::BadRequest("Task has no assigned tasker to message".to_string())
    })?;

    if receiver_id.is_some_and(|r| r != counterpart) {
        return Err(ApiError::BadRequest(
            "Receiver is not the other participant".to_string(),
        ));
    }
    let receiver_id = counterpart;
    let content = message::validate_content(content).map_err(|e| ApiError::invalid("content", e))?;

    let stored = Message::create(&state.db, task.id, sender_id, receiver_id, content).await?;

    let pushed = state.chat.send_to(
        task.id,
        receiver_id,
        &ServerFrame::NewMessage {
            message: stored.clone(),
        },
    );

    tracing::debug!(
        task_id = %task.id,
        message_id = %stored.id,
        live_sockets = pushed,
        "Message delivered"
    );

    notify(
        &state.db,
        receiver_id,
        NotificationKind::NewMessage,
        "New message",
        &format!("New message about \"{}\"", task.title),
        Some(task.id),
    )
    .await;

    Ok(stored)
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let stored = deliver(&state, req.task_id, auth.user_id, None, &req.content).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Conversation for a task, oldest first
///
/// Messages addressed to the caller are marked read.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Message>>> {
    let task = load_task(&state.db, task_id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    let marked = Message::mark_read(&state.db, task_id, auth.user_id).await?;
    if marked > 0 {
        tracing::debug!(task_id = %task_id, user_id = %auth.user_id, marked, "Messages marked read");
    }

    let messages = Message::list_for_task(&state.db, task_id).await?;

    Ok(Json(messages))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCount>> {
    Ok(Json(UnreadCount {
        unread_count: Message::unread_count(&state.db, auth.user_id).await?,
    }))
}
