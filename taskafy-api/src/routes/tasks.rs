/// Task booking and lifecycle endpoints
///
/// # Lifecycle
///
/// ```text
/// POST /api/tasks                  → assigned (instant booking)
/// POST /api/tasks/:id/accept       assigned → in_progress
/// POST /api/tasks/:id/reject       assigned → posted
/// PUT  /api/tasks/:id/status       any allowed transition
/// POST /api/tasks/:id/cancel       posted | assigned | in_progress → cancelled
/// POST /api/tasks/:id/assign/:tid  posted → assigned (from an application)
/// ```
///
/// Every transition is a guarded update; losing a race returns 409.
///
/// # Timer and tracking
///
/// The assigned tasker starts and stops a work timer (accumulated across
/// segments) and streams GPS positions while tracking is on.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{load_task, notify},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{
        authorization::{require_participant, require_role},
        middleware::AuthContext,
    },
    geo,
    models::{
        application::{CreateApplication, TaskApplication},
        category::ServiceCategory,
        coin::{CoinEntry, CoinOutcome, CoinTransaction, CoinTransactionType, TASK_REWARD},
        notification::NotificationKind,
        payment::{CreatePayment, Payment, PaymentMethod, PaymentStatus},
        task::{CreateTask, Task, TaskFilter, TaskStatus},
        user::{TaskerProfile, User, UserRole},
    },
    pricing::{self, CancelParty, CancellationInput, CancellationPenalty},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1 to 5000 characters"))]
    pub description: String,

    pub category_id: Uuid,
    pub subcategory: Option<String>,
    pub tasker_id: Uuid,

    #[validate(range(exclusive_min = 0.0, message = "Duration must be greater than 0"))]
    pub duration_hours: f64,

    #[validate(range(exclusive_min = 0.0, message = "Hourly rate must be greater than 0"))]
    pub hourly_rate: Option<f64>,

    pub task_date: DateTime<Utc>,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,

    pub special_instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub new_status: TaskStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub task: Task,
    pub penalty_amount: f64,
    pub penalty_reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyRequest {
    #[validate(range(exclusive_min = 0.0, message = "Proposed rate must be greater than 0"))]
    pub proposed_rate: f64,

    #[validate(range(exclusive_min = 0.0, message = "Estimated hours must be greater than 0"))]
    pub estimated_hours: f64,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimerStatus {
    pub is_timer_running: bool,
    pub timer_started_at: Option<DateTime<Utc>>,
    pub timer_stopped_at: Option<DateTime<Utc>>,
    pub actual_hours_worked: f64,
    pub current_session_hours: f64,
}

impl TimerStatus {
    fn of(task: &Task, now: DateTime<Utc>) -> Self {
        Self {
            is_timer_running: task.is_timer_running,
            timer_started_at: task.timer_started_at,
            timer_stopped_at: task.timer_stopped_at,
            actual_hours_worked: pricing::round2(task.actual_hours_worked),
            current_session_hours: pricing::round2(task.current_session_hours(now)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub timer: TimerStatus,
}

#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub message: &'static str,
    pub is_tracking: bool,
    pub tracking_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<i32>,
}

fn conflict(message: &str) -> ApiError {
    ApiError::Conflict(message.to_string())
}

/// Requires the caller to be the task's assigned tasker
fn require_assigned(task: &Task, auth: &AuthContext) -> ApiResult<()> {
    if task.is_assigned_to(auth.user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the assigned tasker can perform this action".to_string(),
        ))
    }
}

/// Books a tasker directly (instant booking)
///
/// # Errors
///
/// - `403`: caller is not a client
/// - `404`: tasker or category not found
/// - `400`: tasker is not available
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    require_role(&auth, &[UserRole::Client])?;
    req.validate()?;

    User::find_with_role(&state.db, req.tasker_id, UserRole::Tasker)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    let profile = TaskerProfile::find_by_user(&state.db, req.tasker_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    if !profile.is_available {
        return Err(ApiError::BadRequest("Tasker is not available".to_string()));
    }

    if !ServiceCategory::exists(&state.db, req.category_id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    let hourly_rate = req.hourly_rate.unwrap_or(profile.hourly_rate);

    let task = Task::create(
        &state.db,
        CreateTask {
            client_id: auth.user_id,
            assigned_tasker_id: Some(req.tasker_id),
            title: req.title.trim().to_string(),
            description: req.description,
            category_id: req.category_id,
            subcategory: req.subcategory,
            duration_hours: req.duration_hours,
            hourly_rate,
            total_cost: pricing::total_cost(req.duration_hours, hourly_rate),
            task_date: req.task_date,
            address: req.address,
            city: req.city,
            latitude: req.latitude,
            longitude: req.longitude,
            special_instructions: req.special_instructions,
            status: TaskStatus::Assigned,
            recurring_task_id: None,
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        client_id = %auth.user_id,
        tasker_id = %req.tasker_id,
        total_cost = task.total_cost,
        "Task booked"
    );

    notify(
        &state.db,
        req.tasker_id,
        NotificationKind::TaskBooked,
        "New booking",
        &format!("You have been booked for \"{}\"", task.title),
        Some(task.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(Task::list(&state.db, &filter).await?))
}

/// Open tasks are visible to everyone signed in; booked ones only to their
/// participants and admins
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;

    if task.status != TaskStatus::Posted && auth.role != UserRole::Admin {
        require_participant(&auth, task.client_id, task.assigned_tasker_id)?;
    }

    Ok(Json(task))
}

/// Generic status transition
///
/// `completed` runs the completion transaction (timer fold, tasker counter,
/// client reward); `cancelled` applies the cancellation rules.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    let target = query.new_status;

    if target == TaskStatus::Cancelled {
        let cancelled = cancel(&state, task, &auth, None).await?;
        return Ok(Json(cancelled.task));
    }

    if !task.status.can_transition_to(target) {
        return Err(ApiError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            task.status, target
        )));
    }

    let updated = match target {
        TaskStatus::Completed => complete(&state, &task).await?,
        TaskStatus::Assigned => {
            return Err(ApiError::BadRequest(
                "Assign a tasker through an application".to_string(),
            ))
        }
        TaskStatus::Posted => release(&state, &task, &auth).await?,
        _ => Task::transition(&state.db, id, task.status, target)
            .await?
            .ok_or_else(|| conflict("Task status changed concurrently"))?,
    };

    tracing::info!(
        task_id = %id,
        from = %task.status,
        to = %updated.status,
        user_id = %auth.user_id,
        "Task status updated"
    );

    Ok(Json(updated))
}

/// Completion transaction: status, tasker counter, and the client's reward
async fn complete(state: &AppState, task: &Task) -> ApiResult<Task> {
    let mut tx = state.db.begin().await?;

    let completed = Task::complete(&mut *tx, task.id)
        .await?
        .ok_or_else(|| conflict("Task status changed concurrently"))?;

    if let Some(tasker_id) = completed.assigned_tasker_id {
        TaskerProfile::increment_completed(&mut *tx, tasker_id).await?;
    }

    let reward = CoinTransaction::record(
        &mut *tx,
        CoinEntry {
            user_id: completed.client_id,
            amount: TASK_REWARD,
            transaction_type: CoinTransactionType::TaskReward,
            description: "Task reward",
            task_id: Some(completed.id),
        },
    )
    .await?;

    tx.commit().await?;

    if let CoinOutcome::Recorded { new_balance, .. } = reward {
        tracing::debug!(client_id = %completed.client_id, new_balance, "Task reward credited");
    }

    Ok(completed)
}

pub async fn accept_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    match task.status {
        TaskStatus::Assigned => {}
        TaskStatus::InProgress => return Err(conflict("Task was already accepted")),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Cannot accept a task that is {}",
                other
            )))
        }
    }

    let task = Task::accept(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| conflict("Task was already accepted or changed"))?;

    tracing::info!(task_id = %id, tasker_id = %auth.user_id, "Task accepted");

    Ok(Json(task))
}

pub async fn reject_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    match task.status {
        TaskStatus::Assigned => {}
        TaskStatus::InProgress => return Err(conflict("Task was already accepted")),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Cannot reject a task that is {}",
                other
            )))
        }
    }

    Ok(Json(release(&state, &task, &auth).await?))
}

/// `assigned → posted`: releases the tasker, stops tracking, and tells the
/// other participant
async fn release(state: &AppState, task: &Task, auth: &AuthContext) -> ApiResult<Task> {
    let tasker_id = task
        .assigned_tasker_id
        .ok_or_else(|| ApiError::BadRequest("Task has no assigned tasker".to_string()))?;

    let updated = Task::reject(&state.db, task.id, tasker_id)
        .await?
        .ok_or_else(|| conflict("Task status changed concurrently"))?;

    tracing::info!(
        task_id = %task.id,
        tasker_id = %tasker_id,
        released_by = %auth.user_id,
        "Task released back to posted"
    );

    if auth.user_id == tasker_id {
        notify(
            &state.db,
            updated.client_id,
            NotificationKind::TaskRejected,
            "Booking declined",
            &format!("The tasker declined \"{}\". It is open for other taskers.", updated.title),
            Some(updated.id),
        )
        .await;
    } else {
        notify(
            &state.db,
            tasker_id,
            NotificationKind::TaskRejected,
            "Booking released",
            &format!("The client reopened \"{}\" for other taskers.", updated.title),
            Some(updated.id),
        )
        .await;
    }

    Ok(updated)
}

pub async fn cancel_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult<Json<CancelResponse>> {
    let task = load_task(&state.db, id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(cancel(&state, task, &auth, reason).await?))
}

/// Cancels a non-terminal task, charging the client where the rules say so
async fn cancel(
    state: &AppState,
    task: Task,
    auth: &AuthContext,
    reason: Option<String>,
) -> ApiResult<CancelResponse> {
    if task.status.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "Cannot cancel a task that is {}",
            task.status
        )));
    }

    let now = Utc::now();
    let party = if auth.user_id == task.client_id {
        CancelParty::Client
    } else {
        CancelParty::Tasker
    };

    let penalty = CancellationPenalty::compute(
        CancellationInput {
            status: task.status,
            total_cost: task.total_cost,
            hourly_rate: task.hourly_rate,
            task_date: task.task_date,
            hours_worked: task.hours_worked(now),
        },
        party,
        now,
    );

    let cancelled = Task::cancel(
        &state.db,
        task.id,
        task.status,
        auth.user_id,
        reason.as_deref(),
        penalty.amount,
    )
    .await?
    .ok_or_else(|| conflict("Task status changed concurrently"))?;

    tracing::info!(
        task_id = %task.id,
        cancelled_by = %auth.user_id,
        from = %task.status,
        penalty = penalty.amount,
        "Task cancelled"
    );

    if let Some(other) = cancelled.counterpart_of(auth.user_id) {
        notify(
            &state.db,
            other,
            NotificationKind::TaskCancelled,
            "Task cancelled",
            &format!("\"{}\" has been cancelled", cancelled.title),
            Some(cancelled.id),
        )
        .await;
    }

    Ok(CancelResponse {
        message: "Task cancelled".to_string(),
        task: cancelled,
        penalty_amount: penalty.amount,
        penalty_reason: penalty.reason,
    })
}

/// Records a cash payment on a completed task
pub async fn mark_paid_cash(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::BadRequest(
            "Task must be completed before it can be paid".to_string(),
        ));
    }
    if task.is_paid {
        return Err(ApiError::BadRequest("Task is already paid".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let paid = Task::mark_paid(&mut *tx, id, PaymentMethod::Cash)
        .await?
        .ok_or_else(|| conflict("Task was already marked as paid"))?;

    let payment = Payment::create(
        &mut *tx,
        CreatePayment {
            task_id: id,
            client_id: paid.client_id,
            tasker_id: auth.user_id,
            amount: paid.total_cost,
            payment_method: PaymentMethod::Cash,
            status: PaymentStatus::Completed,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        task_id = %id,
        payment_id = %payment.id,
        amount = payment.amount,
        "Cash payment recorded"
    );

    notify(
        &state.db,
        paid.client_id,
        NotificationKind::PaymentReceived,
        "Payment recorded",
        &format!("Cash payment of {} CFA recorded for \"{}\"", paid.total_cost, paid.title),
        Some(paid.id),
    )
    .await;

    Ok(Json(paid))
}

pub async fn apply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<(StatusCode, Json<TaskApplication>)> {
    require_role(&auth, &[UserRole::Tasker])?;
    req.validate()?;

    let task = load_task(&state.db, id).await?;
    if task.status != TaskStatus::Posted {
        return Err(ApiError::BadRequest(
            "Task is not open for applications".to_string(),
        ));
    }

    let duplicate = || ApiError::BadRequest("You have already applied to this task".to_string());

    if TaskApplication::exists(&state.db, id, auth.user_id).await? {
        return Err(duplicate());
    }

    let application = TaskApplication::create(
        &state.db,
        CreateApplication {
            task_id: id,
            tasker_id: auth.user_id,
            proposed_rate: req.proposed_rate,
            estimated_hours: req.estimated_hours,
            message: req.message,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => duplicate(),
        other => other,
    })?;

    tracing::info!(task_id = %id, tasker_id = %auth.user_id, "Application submitted");

    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskApplication>>> {
    let task = load_task(&state.db, id).await?;
    if task.client_id != auth.user_id {
        return Err(ApiError::Forbidden("Only the task's client can view applications".to_string()));
    }

    Ok(Json(TaskApplication::list_for_task(&state.db, id).await?))
}

/// Assigns a posted task to one of its applicants
///
/// The task move, the accepted application, and the rejection of the other
/// applications commit together.
pub async fn assign(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, tasker_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state.db, id).await?;
    if task.client_id != auth.user_id {
        return Err(ApiError::Forbidden("Only the task's client can assign it".to_string()));
    }
    match task.status {
        TaskStatus::Posted => {}
        TaskStatus::Assigned => return Err(conflict("Task was already assigned")),
        _ => return Err(ApiError::BadRequest("Task is not open for assignment".to_string())),
    }

    let mut tx = state.db.begin().await?;

    let Some(application) = TaskApplication::find_pending(&mut *tx, id, tasker_id).await? else {
        // A concurrent assignment rejects the remaining applications
        let still_open = Task::find_by_id(&mut *tx, id)
            .await?
            .is_some_and(|t| t.status == TaskStatus::Posted);

        return Err(if still_open {
            ApiError::NotFound("Application not found".to_string())
        } else {
            conflict("Task was assigned concurrently")
        });
    };

    let assigned = Task::assign_from_application(&mut *tx, id, tasker_id, application.proposed_rate)
        .await?
        .ok_or_else(|| conflict("Task was assigned concurrently"))?;

    let rejected = TaskApplication::accept_and_reject_others(&mut *tx, id, tasker_id).await?;

    tx.commit().await?;

    tracing::info!(task_id = %id, tasker_id = %tasker_id, rejected, "Task assigned from application");

    notify(
        &state.db,
        tasker_id,
        NotificationKind::TaskBooked,
        "Application accepted",
        &format!("You have been assigned \"{}\"", assigned.title),
        Some(assigned.id),
    )
    .await;

    Ok(Json(assigned))
}

pub async fn start_timer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TimerResponse>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    if task.status != TaskStatus::InProgress {
        return Err(ApiError::BadRequest(
            "Task must be in progress to start the timer".to_string(),
        ));
    }

    let task = Task::start_timer(&state.db, id)
        .await?
        .ok_or_else(|| conflict("Timer already running"))?;

    tracing::info!(task_id = %id, tasker_id = %auth.user_id, "Timer started");

    Ok(Json(TimerResponse {
        message: "Timer started",
        timer: TimerStatus::of(&task, Utc::now()),
    }))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TimerResponse>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    if !task.is_timer_running {
        return Err(ApiError::BadRequest("Timer is not running".to_string()));
    }

    let task = Task::stop_timer(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Timer is not running".to_string()))?;

    tracing::info!(
        task_id = %id,
        hours = task.actual_hours_worked,
        "Timer stopped"
    );

    Ok(Json(TimerResponse {
        message: "Timer stopped",
        timer: TimerStatus::of(&task, Utc::now()),
    }))
}

pub async fn timer_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TimerStatus>> {
    let task = load_task(&state.db, id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    Ok(Json(TimerStatus::of(&task, Utc::now())))
}

pub async fn start_tracking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrackingResponse>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    if !matches!(task.status, TaskStatus::Assigned | TaskStatus::InProgress) {
        return Err(ApiError::BadRequest(
            "Tracking is only available for assigned or in-progress tasks".to_string(),
        ));
    }

    let task = Task::start_tracking(&state.db, id)
        .await?
        .ok_or_else(|| conflict("Tracking already active"))?;

    tracing::info!(task_id = %id, tasker_id = %auth.user_id, "Tracking started");

    Ok(Json(TrackingResponse {
        message: "Tracking started",
        is_tracking: task.is_tracking,
        tracking_started_at: task.tracking_started_at,
    }))
}

pub async fn stop_tracking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TrackingResponse>> {
    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    let task = Task::stop_tracking(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(task_id = %id, "Tracking stopped");

    Ok(Json(TrackingResponse {
        message: "Tracking stopped",
        is_tracking: task.is_tracking,
        tracking_started_at: task.tracking_started_at,
    }))
}

/// Stores the tasker's live position and estimates the arrival
pub async fn update_location(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<Json<LocationResponse>> {
    req.validate()?;

    let task = load_task(&state.db, id).await?;
    require_assigned(&task, &auth)?;

    if !task.is_tracking {
        return Err(ApiError::BadRequest("Tracking is not active".to_string()));
    }

    let task = Task::update_current_location(&state.db, id, req.latitude, req.longitude)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Tracking is not active".to_string()))?;

    let estimate = geo::distance_and_eta((req.latitude, req.longitude), task.coordinates());

    Ok(Json(LocationResponse {
        message: "Location updated",
        distance_km: estimate.map(|(distance, _)| pricing::round2(distance)),
        eta_minutes: estimate.map(|(_, eta)| eta),
    }))
}
