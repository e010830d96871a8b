/// Tasker endpoints
///
/// - `GET /api/taskers/search`: public tasker search
/// - `PUT /api/taskers/profile`: update the caller's tasker profile
/// - `GET /api/taskers/earnings`: earnings summary and history
/// - `GET /api/taskers/applications`: the caller's applications

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{authorization::require_role, middleware::AuthContext},
    models::{
        application::TaskApplication,
        task::{EarningsSummary, Task},
        user::{ServiceOffering, TaskerProfile, TaskerSearch, UpdateTaskerProfile, User, UserRole, UserWithProfile},
    },
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskerProfileRequest {
    #[validate(length(max = 2000, message = "Bio must be at most 2000 characters"))]
    pub bio: Option<String>,

    #[validate(range(exclusive_min = 0.0, message = "Hourly rate must be greater than 0"))]
    pub hourly_rate: Option<f64>,

    pub service_categories: Option<Vec<String>>,
    pub services: Option<Vec<ServiceOffering>>,
    pub certifications: Option<Vec<String>>,
    pub portfolio_images: Option<Vec<String>>,
    pub profile_image: Option<String>,
    pub availability: Option<serde_json::Value>,
    pub is_available: Option<bool>,

    #[validate(range(min = 0.0, message = "Travel distance cannot be negative"))]
    pub max_travel_distance: Option<f64>,

    pub languages_spoken: Option<Vec<String>>,
}

/// Reporting window for earnings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarningsPeriod {
    #[default]
    All,
    Week,
    Month,
}

impl EarningsPeriod {
    /// Lower bound on `completed_at`, if any
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            EarningsPeriod::All => None,
            EarningsPeriod::Week => Some(now - Duration::days(7)),
            EarningsPeriod::Month => Some(now - Duration::days(30)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EarningsQuery {
    #[serde(default)]
    pub period: EarningsPeriod,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    #[serde(flatten)]
    pub summary: EarningsSummary,
    pub history: Vec<Task>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(filter): Query<TaskerSearch>,
) -> ApiResult<Json<Vec<UserWithProfile>>> {
    Ok(Json(User::search_taskers(&state.db, &filter).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateTaskerProfileRequest>,
) -> ApiResult<Json<UserWithProfile>> {
    require_role(&auth, &[UserRole::Tasker])?;
    req.validate()?;

    let update = UpdateTaskerProfile {
        bio: req.bio,
        hourly_rate: req.hourly_rate,
        service_categories: req.service_categories,
        services: req.services,
        certifications: req.certifications,
        portfolio_images: req.portfolio_images,
        profile_image: req.profile_image,
        availability: req.availability,
        is_available: req.is_available,
        max_travel_distance: req.max_travel_distance,
        languages_spoken: req.languages_spoken,
    };

    let profile = TaskerProfile::update(&state.db, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tasker profile not found".to_string()))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(tasker_id = %auth.user_id, is_available = profile.is_available, "Tasker profile updated");

    Ok(Json(UserWithProfile {
        user,
        tasker_profile: Some(profile),
    }))
}

/// Earnings for the caller over `period`
///
/// `total_earnings` and `history` honour the period; the week and month
/// figures are always rolling windows.
pub async fn earnings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<EarningsQuery>,
) -> ApiResult<Json<EarningsResponse>> {
    require_role(&auth, &[UserRole::Tasker])?;

    let since = query.period.since(Utc::now());
    let summary = Task::earnings_summary(&state.db, auth.user_id, since).await?;
    let history = Task::earnings_history(&state.db, auth.user_id, since).await?;

    Ok(Json(EarningsResponse { summary, history }))
}

pub async fn my_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskApplication>>> {
    require_role(&auth, &[UserRole::Tasker])?;

    Ok(Json(TaskApplication::list_for_tasker(&state.db, auth.user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earnings_period_bounds() {
        let now = Utc::now();
        assert!(EarningsPeriod::All.since(now).is_none());
        assert_eq!(EarningsPeriod::Week.since(now), Some(now - Duration::days(7)));
        assert_eq!(EarningsPeriod::Month.since(now), Some(now - Duration::days(30)));
    }

    #[test]
    fn test_earnings_period_parses_lowercase() {
        let query: EarningsQuery = serde_json::from_str(r#"{"period": "week"}"#).unwrap();
        assert_eq!(query.period, EarningsPeriod::Week);

        let query: EarningsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.period, EarningsPeriod::All);
    }

    #[test]
    fn test_hourly_rate_must_be_positive() {
        let req: UpdateTaskerProfileRequest =
            serde_json::from_str(r#"{"hourly_rate": 0}"#).unwrap();
        assert!(req.validate().is_err());

        let req: UpdateTaskerProfileRequest =
            serde_json::from_str(r#"{"hourly_rate": 4500, "is_available": false}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
