/// API route handlers, one module per resource
///
/// - `health`: liveness and dependency status
/// - `auth`: register, login, refresh, me
/// - `users`, `taskers`, `categories`: profiles, search, catalogue
/// - `tasks`: booking, lifecycle, timer, tracking, applications
/// - `location`: per-task tasker position
/// - `messages`: HTTP messaging (the socket relay lives in `crate::ws`)
/// - `payments`, `paydunya`: cash ledger and gateway payments
/// - `reviews`, `badges`, `favorites`, `disputes`, `coins`, `recurring`, `notifications`

pub mod auth;
pub mod badges;
pub mod categories;
pub mod coins;
pub mod disputes;
pub mod favorites;
pub mod health;
pub mod location;
pub mod messages;
pub mod notifications;
pub mod paydunya;
pub mod payments;
pub mod recurring;
pub mod reviews;
pub mod taskers;
pub mod tasks;
pub mod users;

use crate::error::{ApiError, ApiResult};
use sqlx::PgPool;
use taskafy_shared::models::{
    notification::{Notification, NotificationKind},
    task::Task,
};
use uuid::Uuid;

/// Loads a task or fails with 404
pub(crate) async fn load_task(db: &PgPool, id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(db, id)
        .await
        .map_err(|e| ApiError::database("Failed to load task", e))?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Creates a notification without failing the surrounding request
pub(crate) async fn notify(
    db: &PgPool,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    message: &str,
    related_id: Option<Uuid>,
) {
    if let Err(e) = Notification::create(db, user_id, kind, title, message, related_id).await {
        tracing::warn!(
            error = %e,
            user_id = %user_id,
            kind = kind.as_str(),
            "Failed to create notification"
        );
    }
}
