/// Client favorites

use std::collections::HashMap;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        favorite::Favorite,
        user::{User, UserRole, UserWithProfile},
    },
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub tasker_id: Uuid,
}

/// Favorite joined with the tasker's public profile
#[derive(Debug, Serialize)]
pub struct FavoriteTasker {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tasker: UserWithProfile,
}

#[derive(Debug, Serialize)]
pub struct FavoriteCheck {
    pub is_favorite: bool,
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddFavoriteRequest>,
) -> ApiResult<(StatusCode, Json<Favorite>)> {
    require_role(&auth, &[UserRole::Client])?;

    User::find_with_role(&state.db, req.tasker_id, UserRole::Tasker)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker not found".to_string()))?;

    let favorite = Favorite::add(&state.db, auth.user_id, req.tasker_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Tasker is already in your favorites".to_string()))?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<FavoriteTasker>>> {
    let favorites = Favorite::list_for_client(&state.db, auth.user_id).await?;

    let ids: Vec<Uuid> = favorites.iter().map(|f| f.tasker_id).collect();
    let mut taskers: HashMap<Uuid, UserWithProfile> = UserWithProfile::load_many(&state.db, &ids)
        .await?
        .into_iter()
        .map(|t| (t.user.id, t))
        .collect();

    let joined = favorites
        .into_iter()
        .filter_map(|favorite| {
            taskers.remove(&favorite.tasker_id).map(|tasker| FavoriteTasker {
                id: favorite.id,
                created_at: favorite.created_at,
                tasker,
            })
        })
        .collect();

    Ok(Json(joined))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if Favorite::remove(&state.db, auth.user_id, tasker_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Favorite not found".to_string()))
    }
}

pub async fn check_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(tasker_id): Path<Uuid>,
) -> ApiResult<Json<FavoriteCheck>> {
    Ok(Json(FavoriteCheck {
        is_favorite: Favorite::exists(&state.db, auth.user_id, tasker_id).await?,
    }))
}
