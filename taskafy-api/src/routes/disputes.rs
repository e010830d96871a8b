/// Disputes over completed tasks
///
/// Participants open disputes; admins investigate and resolve them. Both
/// parties are notified when a dispute is opened against them and when it
/// is resolved or closed.

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
use serde::Deserialize;
use taskafy_shared::{
    auth::{
        authorization::{require_admin, require_participant},
        middleware::AuthContext,
    },
    models::{
        dispute::{CreateDispute, Dispute, DisputeStatus},
        notification::NotificationKind,
        task::TaskStatus,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDisputeRequest {
    pub task_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Reason must be 1 to 200 characters"))]
    pub reason: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1 to 5000 characters"))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisputeQuery {
    pub status: Option<DisputeStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDisputeRequest {
    pub status: DisputeStatus,
    pub resolution: Option<String>,
}

pub async fn create_dispute(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDisputeRequest>,
) -> ApiResult<(StatusCode, Json<Dispute>)> {
    req.validate()?;

    let task = load_task(&state.db, req.task_id).await?;
    require_participant(&auth, task.client_id, task.assigned_tasker_id)?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::BadRequest(
            "Disputes can only be raised on completed tasks".to_string(),
        ));
    }

    let against_user = task
        .counterpart_of(auth.user_id)
        .ok_or_else(|| ApiError::BadRequest("Task has no other party".to_string()))?;

    let duplicate = || ApiError::BadRequest("A dispute already exists for this task".to_string());

    if Dispute::exists_for_task(&state.db, task.id).await? {
        return Err(duplicate());
    }

    let dispute = Dispute::create(
        &state.db,
        CreateDispute {
            task_id: task.id,
            raised_by: auth.user_id,
            against_user,
            reason: req.reason,
            description: req.description,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => duplicate(),
        other => other,
    })?;

    tracing::info!(dispute_id = %dispute.id, task_id = %task.id, raised_by = %auth.user_id, "Dispute raised");

    notify(
        &state.db,
        against_user,
        NotificationKind::DisputeRaised,
        "Dispute opened",
        &format!("A dispute was opened on \"{}\"", task.title),
        Some(dispute.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(dispute)))
}

/// Admins see everything; other users see disputes they are part of
pub async fn list_disputes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DisputeQuery>,
) -> ApiResult<Json<Vec<Dispute>>> {
    let involving = (!auth.is_admin()).then_some(auth.user_id);

    Ok(Json(Dispute::list(&state.db, involving, query.status).await?))
}

pub async fn get_dispute(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Dispute>> {
    let dispute = Dispute::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dispute not found".to_string()))?;

    if !auth.is_admin() && !dispute.involves(auth.user_id) {
        return Err(ApiError::Forbidden("Not authorized to view this dispute".to_string()));
    }

    Ok(Json(dispute))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDisputeRequest>,
) -> ApiResult<Json<Dispute>> {
    require_admin(&auth)?;

    let resolution = req
        .resolution
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    if req.status.requires_resolution() && resolution.is_none() {
        return Err(ApiError::invalid(
            "resolution",
            "Resolution is required to resolve or close a dispute",
        ));
    }

    let dispute = Dispute::update_status(&state.db, id, req.status, resolution, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dispute not found".to_string()))?;

    tracing::info!(dispute_id = %id, status = ?dispute.status, admin_id = %auth.user_id, "Dispute updated");

    if dispute.status.requires_resolution() {
        for user_id in [dispute.raised_by, dispute.against_user] {
            notify(
                &state.db,
                user_id,
                NotificationKind::DisputeResolved,
                "Dispute resolved",
                dispute.resolution.as_deref().unwrap_or("Your dispute has been resolved"),
                Some(dispute.id),
            )
            .await;
        }
    }

    Ok(Json(dispute))
}
