/// Cash ledger
///
/// - `POST /api/payments`: client opens a pending payment
/// - `POST /api/payments/:id/complete`: either participant completes it
/// - `GET /api/payments/task/:task_id`: payments recorded for a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{load_task, notify},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskafy_shared::{
    auth::{
        authorization::{require_participant, require_role},
        middleware::AuthContext,
    },
    models::{
        notification::NotificationKind,
        payment::{CreatePayment, Payment, PaymentMethod, PaymentStatus},
        task::Task,
        user::UserRole,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub task_id: Uuid,

    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,

    pub payment_method: PaymentMethod,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    require_role(&auth, &[UserRole::Client])?;
    req.validate()?;

    let task = load_task(&state.db, req.task_id).await?;
    if task.client_id != auth.user_id {
        return Err(ApiError::Forbidden("Not your task".to_string()));
    }

    let tasker_id = task
        .assigned_tasker_id
        .ok_or_else(|| ApiError::BadRequest("Task has no assigned tasker".to_string()))?;

    let payment = Payment::create(
        &state.db,
        CreatePayment {
            task_id: task.id,
            client_id: auth.user_id,
            tasker_id,
            amount: req.amount,
            payment_method: req.payment_method,
            status: PaymentStatus::Pending,
        },
    )
    .await?;

    tracing::info!(
        payment_id = %payment.id,
        task_id = %task.id,
        method = payment.payment_method.as_str(),
        amount = payment.amount,
        "Payment created"
    );

    Ok((StatusCode::CREATED, Json(payment)))
}

/// Completes a pending payment and flags the task paid
///
/// Both writes commit together. A task that is already paid keeps its
/// original payment method.
pub async fn complete_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Payment>> {
    let payment = Payment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    let task = load_task(&state.db, payment.task_id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    let mut tx = state.db.begin().await?;

    let completed = Payment::complete(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Payment is not pending".to_string()))?;

    let newly_paid = Task::mark_paid(&mut *tx, completed.task_id, completed.payment_method)
        .await?
        .is_some();

    tx.commit().await?;

    tracing::info!(
        payment_id = %id,
        task_id = %completed.task_id,
        newly_paid,
        "Payment completed"
    );

    notify(
        &state.db,
        completed.tasker_id,
        NotificationKind::PaymentReceived,
        "Payment received",
        &format!("Payment of {} CFA received for \"{}\"", completed.amount, task.title),
        Some(task.id),
    )
    .await;

    Ok(Json(completed))
}

pub async fn list_for_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Payment>>> {
    let task = load_task(&state.db, task_id).await?;
    if !auth.is_admin() {
        require_participant(&auth, task.client_id, task.assigned_tasker_id)?;
    }

    Ok(Json(Payment::list_for_task(&state.db, task_id).await?))
}
