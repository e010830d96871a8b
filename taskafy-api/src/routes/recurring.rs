/// Recurring booking schedules
///
/// A schedule is a template; the worker turns each due occurrence into an
/// assigned task. Clients own schedules, the tasker sees the ones booked
/// with them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{
        authorization::{require_ownership, require_role},
        middleware::AuthContext,
    },
    models::{
        category::ServiceCategory,
        recurring::{CreateRecurringTask, RecurrenceFrequency, RecurringTask},
        user::{User, UserRole},
    },
    recurrence,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub assigned_tasker_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1 to 5000 characters"))]
    pub description: String,

    pub category_id: Uuid,

    /// `daily`, `weekly`, `biweekly` or `monthly`
    pub frequency: String,

    /// `HH:MM`, UTC
    pub scheduled_time: String,

    pub day_of_week: Option<i32>,
    pub day_of_month: Option<i32>,

    #[validate(range(exclusive_min = 0.0, message = "Hourly rate must be greater than 0"))]
    pub hourly_rate: f64,

    #[validate(range(exclusive_min = 0.0, message = "Estimated hours must be greater than 0"))]
    pub estimated_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub message: &'static str,
    pub is_active: bool,
}

async fn load_schedule(state: &AppState, id: Uuid) -> ApiResult<RecurringTask> {
    RecurringTask::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recurring task not found".to_string()))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateScheduleRequest>,
) -> ApiResult<(StatusCode, Json<RecurringTask>)> {
    require_role(&auth, &[UserRole::Client])?;
    req.validate()?;

    let frequency: RecurrenceFrequency = req.frequency.parse()?;
    let next_occurrence = recurrence::next_occurrence(
        Utc::now(),
        frequency,
        &req.scheduled_time,
        req.day_of_week,
        req.day_of_month,
    )?;

    User::find_with_role(&state.db, req.assigned_tasker_id, UserRole::Tasker)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    if !ServiceCategory::exists(&state.db, req.category_id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    let schedule = RecurringTask::create(
        &state.db,
        CreateRecurringTask {
            client_id: auth.user_id,
            assigned_tasker_id: req.assigned_tasker_id,
            title: req.title.trim().to_string(),
            description: req.description,
            category_id: req.category_id,
            frequency,
            scheduled_time: req.scheduled_time,
            day_of_week: req.day_of_week,
            day_of_month: req.day_of_month,
            hourly_rate: req.hourly_rate,
            estimated_hours: req.estimated_hours,
            next_occurrence,
        },
    )
    .await?;

    tracing::info!(
        schedule_id = %schedule.id,
        frequency = frequency.as_str(),
        next_occurrence = %schedule.next_occurrence,
        "Recurring task created"
    );

    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<RecurringTask>>> {
    let schedules = if auth.is_tasker() {
        RecurringTask::list_for_tasker(&state.db, auth.user_id).await?
    } else {
        RecurringTask::list_for_client(&state.db, auth.user_id).await?
    };

    Ok(Json(schedules))
}

/// Pauses or resumes a schedule
///
/// Resuming recomputes the next occurrence from now so a long pause does not
/// trigger a burst of overdue bookings.
pub async fn toggle_schedule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ToggleResponse>> {
    let schedule = load_schedule(&state, id).await?;
    require_ownership(&auth, schedule.client_id)?;

    let activate = !schedule.is_active;
    let next_occurrence = if activate {
        Some(recurrence::next_occurrence(
            Utc::now(),
            schedule.frequency,
            &schedule.scheduled_time,
            schedule.day_of_week,
            schedule.day_of_month,
        )?)
    } else {
        None
    };

    let updated = RecurringTask::set_active(&state.db, id, activate, next_occurrence)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recurring task not found".to_string()))?;

    tracing::info!(schedule_id = %id, is_active = updated.is_active, "Recurring task toggled");

    Ok(Json(ToggleResponse {
        message: if updated.is_active {
            "Recurring task activated"
        } else {
            "Recurring task paused"
        },
        is_active: updated.is_active,
    }))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let schedule = load_schedule(&state, id).await?;
    require_ownership(&auth, schedule.client_id)?;

    if !RecurringTask::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Recurring task not found".to_string()));
    }

    tracing::info!(schedule_id = %id, "Recurring task deleted");

    Ok(StatusCode::NO_CONTENT)
}
