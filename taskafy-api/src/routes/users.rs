/// User profile endpoints
///
/// - `GET /api/users/:id`: public profile
/// - `PUT /api/users/profile`: partial update of the caller's profile
/// - `PUT /api/users/location`: set the caller's coordinates

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use taskafy_shared::{
    auth::middleware::AuthContext,
    models::user::{Country, Language, UpdateUser, User, UserWithProfile},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub full_name: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    pub language: Option<Language>,
    pub country: Option<Country>,
    pub address: Option<String>,
    pub city: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    pub address: Option<String>,
    pub city: Option<String>,
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserWithProfile>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserWithProfile::load(&state.db, user).await?))
}

/// Updates the caller's profile; absent fields are left untouched
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserWithProfile>> {
    req.validate()?;

    let update = UpdateUser {
        full_name: req.full_name.map(|name| name.trim().to_string()),
        phone: req.phone,
        language: req.language,
        country: req.country,
        address: req.address,
        city: req.city,
        latitude: req.latitude,
        longitude: req.longitude,
    };

    let user = if update.is_empty() {
        User::find_by_id(&state.db, auth.user_id).await?
    } else {
        User::update(&state.db, auth.user_id, update).await?
    }
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(UserWithProfile::load(&state.db, user).await?))
}

pub async fn update_location(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateLocationRequest>,
) -> ApiResult<Json<UserWithProfile>> {
    req.validate()?;

    let user = User::update_location(
        &state.db,
        auth.user_id,
        req.latitude,
        req.longitude,
        req.address,
        req.city,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserWithProfile::load(&state.db, user).await?))
}
