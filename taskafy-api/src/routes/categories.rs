/// Service catalogue, public and read-only

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use taskafy_shared::models::category::ServiceCategory;
use uuid::Uuid;

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<ServiceCategory>>> {
    Ok(Json(ServiceCategory::list(&state.db).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceCategory>> {
    ServiceCategory::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}
