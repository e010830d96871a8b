/// Tasker position reports per task
///
/// - `POST /api/location/update`: the assigned tasker reports a position
/// - `GET /api/location/tasker/:tasker_id/task/:task_id`: last known position

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::load_task,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    geo,
    models::{location::TaskerLocation, user::UserRole},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub task_id: Uuid,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct UpdateLocationResponse {
    pub message: &'static str,
    pub estimated_arrival_minutes: Option<i32>,
}

pub async fn update_location(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateLocationRequest>,
) -> ApiResult<Json<UpdateLocationResponse>> {
    require_role(&auth, &[UserRole::Tasker])?;
    req.validate()?;

    let task = load_task(&state.db, req.task_id).await?;
    if !task.is_assigned_to(auth.user_id) {
        return Err(ApiError::Forbidden("You are not assigned to this task".to_string()));
    }

    let eta = geo::distance_and_eta((req.latitude, req.longitude), task.coordinates())
        .map(|(_, eta)| eta);

    let location = TaskerLocation::upsert(
        &state.db,
        auth.user_id,
        task.id,
        req.latitude,
        req.longitude,
        eta,
    )
    .await?;

    tracing::debug!(task_id = %task.id, tasker_id = %auth.user_id, eta = ?eta, "Tasker location updated");

    Ok(Json(UpdateLocationResponse {
        message: "Location updated",
        estimated_arrival_minutes: location.estimated_arrival_minutes,
    }))
}

/// Visible to the task's client, the tasker, and admins
pub async fn get_location(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((tasker_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TaskerLocation>> {
    let task = load_task(&state.db, task_id).await?;

    if !(auth.is_admin() || auth.user_id == tasker_id || auth.user_id == task.client_id) {
        return Err(ApiError::Forbidden(
            "Not authorized to view this location".to_string(),
        ));
    }

    TaskerLocation::find(&state.db, tasker_id, task_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Location not available".to_string()))
}
