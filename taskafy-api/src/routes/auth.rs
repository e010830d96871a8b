/// Authentication endpoints
///
/// - `POST /api/auth/register`: create an account, credit the welcome bonus
/// - `POST /api/auth/login`: exchange credentials for tokens
/// - `POST /api/auth/refresh`: exchange a refresh token for an access token
/// - `GET /api/auth/me`: current user with tasker profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskafy_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        coin::{CoinEntry, CoinOutcome, CoinTransaction, CoinTransactionType, WELCOME_BONUS},
        user::{Country, CreateUser, Language, TaskerProfile, User, UserRole, UserWithProfile},
    },
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub full_name: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    pub role: UserRole,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub country: Country,

    pub address: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserWithProfile,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Registers a client or tasker
///
/// The user row, the tasker profile, and the welcome bonus ledger entry are
/// written in one transaction.
///
/// # Errors
///
/// - `400`: email already registered, or `role = admin`
/// - `422`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid("password", e))?;

    if req.role == UserRole::Admin {
        return Err(ApiError::BadRequest(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            full_name: req.full_name.trim().to_string(),
            phone: req.phone,
            role: req.role,
            language: req.language,
            country: req.country,
            address: req.address,
            city: req.city,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::BadRequest("Email already registered".to_string()),
        other => other,
    })?;

    let tasker_profile = if user.role == UserRole::Tasker {
        Some(TaskerProfile::create_default(&mut *tx, user.id).await?)
    } else {
        None
    };

    let outcome = CoinTransaction::record(
        &mut *tx,
        CoinEntry {
            user_id: user.id,
            amount: WELCOME_BONUS,
            transaction_type: CoinTransactionType::WelcomeBonus,
            description: "Welcome bonus",
            task_id: None,
        },
    )
    .await?;

    let coin_balance = match outcome {
        CoinOutcome::Recorded { new_balance, .. } => new_balance,
        _ => user.coin_balance,
    };

    tx.commit().await?;

    let (access_token, refresh_token) = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    let user = User { coin_balance, ..user };

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
            user: UserWithProfile { user, tasker_profile },
        }),
    ))
}

/// Authenticates with email and password
///
/// # Errors
///
/// - `401`: unknown email, wrong password, or inactive account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is inactive".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let (access_token, refresh_token) = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
        user: UserWithProfile::load(&state.db, user).await?,
    }))
}

/// Issues a new access token
///
/// The user is reloaded so a deactivated account or changed role is
/// honoured at refresh time.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let access_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Access),
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserWithProfile>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserWithProfile::load(&state.db, user).await?))
}
