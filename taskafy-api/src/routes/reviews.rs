/// Reviews and ratings
///
/// A client may review a task once, after it is completed and paid, within
/// seven days of completion. The tasker's cached rating is refreshed in the
/// same transaction as the insert.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::load_task,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taskafy_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        review::{CreateReview, Review, ReviewEligibility},
        task::Task,
        user::{TaskerProfile, User, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub task_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct TaskerRating {
    pub tasker_id: Uuid,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub rating_distribution: BTreeMap<String, i64>,
    pub completed_tasks: i64,
}

#[derive(Debug, Serialize)]
pub struct CanReview {
    pub can_review: bool,
    pub reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ClientStats {
    pub client_id: Uuid,
    pub total_completed_tasks: i64,
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    require_role(&auth, &[UserRole::Client])?;
    req.validate()?;

    let task = load_task(&state.db, req.task_id).await?;
    let already_reviewed = Review::exists_for_task(&state.db, task.id).await?;

    match ReviewEligibility::check(&task, auth.user_id, already_reviewed, Utc::now()) {
        ReviewEligibility::Eligible => {}
        ReviewEligibility::NotYourTask => {
            return Err(ApiError::Forbidden("Not your task".to_string()))
        }
        other => return Err(ApiError::BadRequest(other.reason().to_string())),
    }

    let tasker_id = task
        .assigned_tasker_id
        .ok_or_else(|| ApiError::BadRequest("Task has no assigned tasker".to_string()))?;

    let client = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let review = Review::create_and_refresh(
        &state.db,
        CreateReview {
            task_id: task.id,
            tasker_id,
            client_id: auth.user_id,
            client_name: client.full_name,
            rating: req.rating,
            comment: req.comment.trim().to_string(),
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::BadRequest("Already reviewed".to_string()),
        other => other,
    })?;

    tracing::info!(
        review_id = %review.id,
        task_id = %task.id,
        tasker_id = %tasker_id,
        rating = review.rating,
        "Review created"
    );

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_for_tasker(
    State(state): State<AppState>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(Review::list_for_tasker(&state.db, tasker_id).await?))
}

pub async fn tasker_rating(
    State(state): State<AppState>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<TaskerRating>> {
    TaskerProfile::find_by_user(&state.db, tasker_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    let breakdown = Review::rating_breakdown(&state.db, tasker_id).await?;
    let completed_tasks = Task::count_paid_for_tasker(&state.db, tasker_id).await?;

    Ok(Json(TaskerRating {
        tasker_id,
        average_rating: breakdown.average_rating,
        total_reviews: breakdown.total_reviews,
        rating_distribution: breakdown.rating_distribution,
        completed_tasks,
    }))
}

/// Whether the caller may review a task, with the reason
pub async fn can_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<CanReview>> {
    let Some(task) = Task::find_by_id(&state.db, task_id).await? else {
        return Ok(Json(CanReview {
            can_review: false,
            reason: "Task not found",
        }));
    };

    let already_reviewed = Review::exists_for_task(&state.db, task_id).await?;
    let eligibility = ReviewEligibility::check(&task, auth.user_id, already_reviewed, Utc::now());

    Ok(Json(CanReview {
        can_review: eligibility.is_eligible(),
        reason: eligibility.reason(),
    }))
}

pub async fn client_stats(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<ClientStats>> {
    Ok(Json(ClientStats {
        client_id,
        total_completed_tasks: Task::count_paid_for_client(&state.db, client_id).await?,
    }))
}
