/// Tasker badges, computed on read
///
/// Verification is the only stored input; admins set it here.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use taskafy_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    badges::{self, Badge, TaskOutcomes},
    models::{
        task::Task,
        user::{TaskerProfile, User, UserRole},
    },
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct TaskerBadges {
    pub tasker_id: Uuid,
    pub badges: Vec<Badge>,
    pub total_badges: usize,
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub message: &'static str,
    pub tasker_id: Uuid,
    pub is_verified: bool,
}

pub async fn tasker_badges(
    State(state): State<AppState>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<TaskerBadges>> {
    let not_found = || ApiError::NotFound("Tasker not found".to_string());

    let user = User::find_with_role(&state.db, tasker_id, UserRole::Tasker)
        .await?
        .ok_or_else(not_found)?;
    let profile = TaskerProfile::find_by_user(&state.db, tasker_id)
        .await?
        .ok_or_else(not_found)?;

    let (completed, cancelled) = Task::outcome_counts(&state.db, tasker_id).await?;
    let earned = badges::evaluate(&user, &profile, TaskOutcomes { completed, cancelled });

    Ok(Json(TaskerBadges {
        tasker_id,
        total_badges: earned.len(),
        badges: earned,
    }))
}

async fn set_verified(
    state: &AppState,
    auth: &AuthContext,
    tasker_id: Uuid,
    verified: bool,
) -> ApiResult<Json<VerificationResponse>> {
    require_admin(auth)?;

    let user = User::set_verified(&state.db, tasker_id, verified)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    tracing::info!(tasker_id = %tasker_id, admin_id = %auth.user_id, verified, "Tasker verification changed");

    Ok(Json(VerificationResponse {
        message: if verified { "Tasker verified" } else { "Tasker unverified" },
        tasker_id,
        is_verified: user.is_verified,
    }))
}

pub async fn verify_tasker(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<VerificationResponse>> {
    set_verified(&state, &auth, tasker_id, true).await
}

pub async fn unverify_tasker(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<VerificationResponse>> {
    set_verified(&state, &auth, tasker_id, false).await
}
